use crate::{ItemId, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Zone(ZoneEvent),
    Item(ItemEvent),
}

/// Zone related events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneEvent {
    /// The initial description of the zone is complete.
    ///
    /// [`zone_size`] and [`zone_handle`] are populated once this arrives.
    ///
    /// [`zone_size`]: crate::Zones::zone_size
    /// [`zone_handle`]: crate::Zones::zone_handle
    Described(ZoneId),

    /// The zone changed size after its initial description.
    Resized(ZoneId),
}

/// Item related events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEvent {
    /// The item became a member of the zone.
    Entered { item: ItemId, zone: ZoneId },

    /// The item is no longer a member of the zone.
    Left { item: ItemId, zone: ZoneId },

    /// Answer to [`request_position`]: the item's position relative to the zone.
    ///
    /// [`request_position`]: crate::Zones::request_position
    Position {
        item: ItemId,
        zone: ZoneId,
        x: i32,
        y: i32,
    },

    /// A position or layer request for the item could not be satisfied.
    PositionFailed { item: ItemId, zone: ZoneId },
}
