//! Zones and the requests that operate on them.
//!
//! The functions in this module carry the actual placement semantics. Protocol dispatch
//! for `ext_zone_v1` reduces each request to one of them and maps failures onto the
//! `position_failed` event where the protocol has one.

use tracing::debug;
use wayland_server::{backend::ClientId, Client, DataInit, Dispatch, DisplayHandle, Resource};

use crate::{
    error::ZoneError,
    handler::ZonesHandler,
    item::ItemId,
    protocol::ext_zone_v1::{self, ExtZoneV1},
    registry::ZonesState,
    space::{self, LocalPoint, ScreenRect},
    stacking,
};

slotmap::new_key_type! {
    /// Stable key of a zone in the zone engine.
    pub struct ZoneId;
}

/// Where a zone takes its area from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSource {
    /// The zone mirrors the geometry of the output it was created for.
    Output,

    /// The zone's area is read from configuration under the zone's handle.
    Config,
}

/// A named rectangular region windows can be placed in.
#[derive(Debug)]
pub struct Zone {
    /// Unique name of the zone. Immutable after creation.
    pub(crate) handle: String,

    /// Area of the zone in the global space.
    pub(crate) area: ScreenRect,

    /// The authority that updates `area`.
    pub(crate) source: ZoneSource,

    /// Items currently placed in the zone, in insertion order.
    pub(crate) members: Vec<ItemId>,

    /// Protocol handles bound to this zone, across all clients, in bind order.
    pub(crate) instances: Vec<ExtZoneV1>,
}

impl Zone {
    pub(crate) fn new(handle: impl Into<String>, area: ScreenRect, source: ZoneSource) -> Self {
        Self {
            handle: handle.into(),
            area,
            source,
            members: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Unique name of the zone.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Area of the zone in the global space.
    pub fn area(&self) -> ScreenRect {
        self.area
    }

    /// The authority that updates the zone's area.
    pub fn source(&self) -> ZoneSource {
        self.source
    }

    /// Items currently placed in the zone, in insertion order.
    pub fn members(&self) -> &[ItemId] {
        &self.members
    }

    /// Send the initial description of the zone to one new protocol handle.
    ///
    /// The order is a protocol contract: size, then handle, then done.
    pub(crate) fn describe(&self, instance: &ExtZoneV1) {
        instance.size(self.area.size.width, self.area.size.height);
        instance.handle(self.handle.clone());
        instance.done();
    }

    /// Update the zone's area, notifying bound clients if the size changed.
    ///
    /// Origin-only changes are silent: clients observe positions relative to the zone,
    /// and those did not change.
    pub(crate) fn update_area(&mut self, area: ScreenRect) {
        if area == self.area {
            return;
        }

        let size_changed = area.size != self.area.size;
        self.area = area;

        if size_changed {
            for instance in &self.instances {
                instance.size(area.size.width, area.size.height);
            }
        }
    }
}

/// Place `item` into `zone`.
///
/// If the item is currently in a different zone it leaves that zone first, with the
/// item_left notification and constraint retraction that entails. Re-adding an item to
/// the zone it is already in does nothing.
pub(crate) fn add_item<D: ZonesHandler>(state: &mut D, zone: ZoneId, item: ItemId) -> Result<(), ZoneError> {
    let zones = state.zones_state();

    if !zones.zones.contains_key(zone) {
        return Err(ZoneError::NotFound);
    }

    let previous = zones.items.get(item).ok_or(ZoneError::NotFound)?.zone;
    if previous == Some(zone) {
        return Ok(());
    }

    if let Some(previous) = previous {
        leave(state, previous, item);
    }

    let zones = state.zones_state();
    zones.zones.get_mut(zone).ok_or(ZoneError::NotFound)?.members.push(item);
    zones.items.get_mut(item).ok_or(ZoneError::NotFound)?.zone = Some(zone);
    zones.broadcast_entered(zone, item);

    stacking::apply(state, zone, item);

    Ok(())
}

/// Remove `item` from `zone`.
pub(crate) fn remove_item<D: ZonesHandler>(state: &mut D, zone: ZoneId, item: ItemId) -> Result<(), ZoneError> {
    let zones = state.zones_state();

    if !zones.zones.contains_key(zone) {
        return Err(ZoneError::NotFound);
    }
    if zones.items.get(item).ok_or(ZoneError::NotFound)?.zone != Some(zone) {
        return Err(ZoneError::Unbound);
    }

    leave(state, zone, item);

    Ok(())
}

/// Take `item` out of `zone` and tell everyone who needs to know.
///
/// Back-references are cleared before any notification or host callback runs, so
/// anything reentered from those paths observes the item as already detached.
pub(crate) fn leave<D: ZonesHandler>(state: &mut D, zone: ZoneId, item: ItemId) {
    let zones = state.zones_state();

    if let Some(zone) = zones.zones.get_mut(zone) {
        zone.members.retain(|&member| member != item);
    }
    if let Some(item) = zones.items.get_mut(item) {
        item.zone = None;
    }

    zones.broadcast_left(zone, item);
    stacking::retract(state, zone, item);
}

/// Current position of `item`'s toplevel, relative to `zone`'s top-left corner.
pub(crate) fn position<D: ZonesHandler>(state: &mut D, zone: ZoneId, item: ItemId) -> Result<LocalPoint, ZoneError> {
    let zones = state.zones_state();

    let area = zones.zones.get(zone).ok_or(ZoneError::NotFound)?.area;
    let entry = zones.items.get(item).ok_or(ZoneError::NotFound)?;
    if entry.zone != Some(zone) {
        return Err(ZoneError::Unbound);
    }

    let toplevel = entry.toplevel.clone();
    let frame = state.window_geometry(&toplevel).ok_or(ZoneError::WindowGone)?;

    Ok(space::to_local(&area, frame.origin))
}

/// Move `item`'s toplevel so its top-left corner sits at `position` within `zone`.
///
/// The move is validated before anything changes: a target outside the zone's area
/// leaves the toplevel where it is.
pub(crate) fn set_position<D: ZonesHandler>(
    state: &mut D,
    zone: ZoneId,
    item: ItemId,
    position: LocalPoint,
) -> Result<(), ZoneError> {
    let zones = state.zones_state();

    let area = zones.zones.get(zone).ok_or(ZoneError::NotFound)?.area;
    let entry = zones.items.get(item).ok_or(ZoneError::NotFound)?;
    if entry.zone != Some(zone) {
        return Err(ZoneError::Unbound);
    }

    let toplevel = entry.toplevel.clone();
    state.window_geometry(&toplevel).ok_or(ZoneError::WindowGone)?;

    let target = space::to_screen(&area, position);
    if !area.contains(target) {
        return Err(ZoneError::OutOfBounds);
    }

    state.move_window(&toplevel, target);

    Ok(())
}

/// Set the stacking layer of `item` within `zone` and rebuild its pairwise constraints.
pub(crate) fn set_layer<D: ZonesHandler>(
    state: &mut D,
    zone: ZoneId,
    item: ItemId,
    layer: i32,
) -> Result<(), ZoneError> {
    let zones = state.zones_state();

    if !zones.zones.contains_key(zone) {
        return Err(ZoneError::NotFound);
    }

    let entry = zones.items.get_mut(item).ok_or(ZoneError::NotFound)?;
    if entry.zone != Some(zone) {
        return Err(ZoneError::Unbound);
    }
    entry.layer = layer;

    stacking::apply(state, zone, item);

    Ok(())
}

impl<D> Dispatch<ExtZoneV1, ZoneId, D> for ZonesState
where
    D: Dispatch<ExtZoneV1, ZoneId> + ZonesHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        resource: &ExtZoneV1,
        request: ext_zone_v1::Request,
        data: &ZoneId,
        _dhandle: &DisplayHandle,
        _init: &mut DataInit<'_, D>,
    ) {
        let zone = *data;

        match request {
            ext_zone_v1::Request::Destroy => {}

            ext_zone_v1::Request::AddItem { item } => {
                let item = *item.data::<ItemId>().unwrap();

                if let Err(err) = add_item(state, zone, item) {
                    debug!(%err, "ignoring add_item");
                }
            }

            ext_zone_v1::Request::RemoveItem { item } => {
                let item = *item.data::<ItemId>().unwrap();

                if let Err(err) = remove_item(state, zone, item) {
                    debug!(%err, "ignoring remove_item");
                }
            }

            ext_zone_v1::Request::SetPosition { item, x, y } => {
                let item_id = *item.data::<ItemId>().unwrap();

                if let Err(err) = set_position(state, zone, item_id, LocalPoint::new(x, y)) {
                    debug!(%err, x, y, "set_position failed");
                    resource.position_failed(&item);
                }
            }

            ext_zone_v1::Request::GetPosition { item } => {
                let item_id = *item.data::<ItemId>().unwrap();

                match position(state, zone, item_id) {
                    Ok(point) => resource.position(&item, point.x, point.y),
                    Err(err) => {
                        debug!(%err, "get_position failed");
                        resource.position_failed(&item);
                    }
                }
            }

            ext_zone_v1::Request::SetLayer { item, layer_index } => {
                let item_id = *item.data::<ItemId>().unwrap();

                if let Err(err) = set_layer(state, zone, item_id, layer_index) {
                    debug!(%err, layer_index, "set_layer failed");
                    resource.position_failed(&item);
                }
            }
        }
    }

    fn destroyed(state: &mut D, _client: ClientId, resource: &ExtZoneV1, data: &ZoneId) {
        state.zones_state().drop_zone_instance(*data, resource.id());
    }
}
