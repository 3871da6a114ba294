//! Windows enrolled with the zone engine.

use wayland_protocols::xdg::shell::server::xdg_toplevel::XdgToplevel;
use wayland_server::{backend::ClientId, Client, DataInit, Dispatch, DisplayHandle, Resource};

use crate::{
    handler::ZonesHandler,
    protocol::ext_zone_item_v1::{self, ExtZoneItemV1},
    registry::ZonesState,
    zone::ZoneId,
};

slotmap::new_key_type! {
    /// Stable key of an item in the zone engine.
    pub struct ItemId;
}

/// A window enrolled with the zone engine.
///
/// An item comes into being the first time any client asks for an `ext_zone_item_v1`
/// referring to a toplevel and lives until that toplevel is destroyed. Protocol handles
/// come and go independently of the item itself.
#[derive(Debug)]
pub struct ZoneItem {
    /// The toplevel this item stands for.
    pub(crate) toplevel: XdgToplevel,

    /// The zone the item currently occupies.
    pub(crate) zone: Option<ZoneId>,

    /// Stacking layer of the item. Items on higher layers stack above items on lower ones.
    pub(crate) layer: i32,

    /// Protocol handles referring to this item, across all clients.
    pub(crate) instances: Vec<ExtZoneItemV1>,
}

impl ZoneItem {
    pub(crate) fn new(toplevel: XdgToplevel) -> Self {
        Self {
            toplevel,
            zone: None,
            layer: 0,
            instances: Vec::new(),
        }
    }

    /// The toplevel this item stands for.
    pub fn toplevel(&self) -> &XdgToplevel {
        &self.toplevel
    }

    /// The zone the item currently occupies, if any.
    pub fn zone(&self) -> Option<ZoneId> {
        self.zone
    }

    /// Stacking layer of the item.
    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// First live handle owned by `client`, used to reference the item in events.
    pub(crate) fn instance_for(&self, client: &ClientId) -> Option<&ExtZoneItemV1> {
        self.instances
            .iter()
            .find(|instance| instance.client().map(|c| c.id()).as_ref() == Some(client))
    }
}

impl<D> Dispatch<ExtZoneItemV1, ItemId, D> for ZonesState
where
    D: Dispatch<ExtZoneItemV1, ItemId> + ZonesHandler,
{
    fn request(
        _state: &mut D,
        _client: &Client,
        _resource: &ExtZoneItemV1,
        request: ext_zone_item_v1::Request,
        _data: &ItemId,
        _dhandle: &DisplayHandle,
        _init: &mut DataInit<'_, D>,
    ) {
        match request {
            // Destroying a handle does not end the item: the item follows the lifetime
            // of its toplevel.
            ext_zone_item_v1::Request::Destroy => {}
        }
    }

    fn destroyed(state: &mut D, _client: ClientId, resource: &ExtZoneItemV1, data: &ItemId) {
        state.zones_state().drop_item_instance(*data, resource.id());
    }
}
