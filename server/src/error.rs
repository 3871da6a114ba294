/// An error that may occur when manipulating zones or their members.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ZoneError {
    /// The zone or item key does not refer to a live entity.
    #[error("no such zone or item")]
    NotFound,

    /// The item is not a member of the zone being operated on.
    #[error("item is not a member of the zone")]
    Unbound,

    /// The window backing the item is gone.
    #[error("the window backing the item is gone")]
    WindowGone,

    /// The requested position would place the window frame outside the zone.
    #[error("position lies outside of the zone area")]
    OutOfBounds,
}
