//! Coordinate spaces used by the zone engine.
//!
//! Two spaces are in play: the compositor's global space in which outputs and window
//! frames are placed, and the space local to a single zone with its origin at the zone's
//! top-left corner. Mixing the two is the classic source of off-by-an-output bugs, so the
//! euclid unit tags keep them apart at the type level.

use euclid::{Point2D, Rect, Size2D};

/// Unit tag for the compositor's global coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen;

/// Unit tag for coordinates relative to a zone's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local;

pub type ScreenPoint = Point2D<i32, Screen>;
pub type ScreenSize = Size2D<i32, Screen>;
pub type ScreenRect = Rect<i32, Screen>;
pub type LocalPoint = Point2D<i32, Local>;

/// Translate a zone-local position into the global space.
pub fn to_screen(area: &ScreenRect, local: LocalPoint) -> ScreenPoint {
    area.origin + local.to_vector().cast_unit()
}

/// Translate a global position into the space of a zone.
pub fn to_local(area: &ScreenRect, screen: ScreenPoint) -> LocalPoint {
    let offset = screen - area.origin;
    LocalPoint::new(offset.x, offset.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_roundtrip() {
        let area = ScreenRect::new(ScreenPoint::new(1920, 0), ScreenSize::new(1280, 1024));
        let local = LocalPoint::new(40, 60);

        let screen = to_screen(&area, local);
        assert_eq!(screen, ScreenPoint::new(1960, 60));
        assert_eq!(to_local(&area, screen), local);
    }

    #[test]
    fn negative_offsets_translate() {
        let area = ScreenRect::new(ScreenPoint::new(100, 100), ScreenSize::new(50, 50));

        assert_eq!(to_local(&area, ScreenPoint::new(80, 90)), LocalPoint::new(-20, -10));
    }
}
