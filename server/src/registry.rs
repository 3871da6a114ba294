//! The zone registry and the `ext_zone_manager_v1` global.
//!
//! [`ZonesState`] owns the canonical storage for zones and items. Everything else holds
//! slotmap keys into it, so tearing an entity down is a single arena removal and stale
//! keys turn into failed lookups instead of dangling pointers.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use tracing::debug;
use wayland_protocols::xdg::shell::server::xdg_toplevel::XdgToplevel;
use wayland_server::{
    backend::{GlobalId, ObjectId},
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

use crate::{
    config::ZonesConfig,
    handler::ZonesHandler,
    item::{ItemId, ZoneItem},
    protocol::{
        ext_zone_item_v1::ExtZoneItemV1,
        ext_zone_manager_v1::{self, ExtZoneManagerV1},
        ext_zone_v1::ExtZoneV1,
    },
    space::ScreenRect,
    stacking,
    zone::{self, Zone, ZoneId, ZoneSource},
};

/// State of the zone engine, embedded in the compositor state.
#[derive(Debug)]
pub struct ZonesState {
    /// Canonical storage of all zones.
    pub(crate) zones: SlotMap<ZoneId, Zone>,

    /// Canonical storage of all items.
    pub(crate) items: SlotMap<ItemId, ZoneItem>,

    /// Zone lookup by handle. Output and config sourced zones share one namespace;
    /// whichever source first asks for a handle determines the zone's authority.
    pub(crate) zones_by_handle: FxHashMap<String, ZoneId>,

    /// Item lookup by toplevel.
    pub(crate) items_by_toplevel: FxHashMap<ObjectId, ItemId>,

    /// Current configuration, consulted when config sourced zones are created.
    config: ZonesConfig,

    global: GlobalId,
}

impl ZonesState {
    /// Create the `ext_zone_manager_v1` global.
    pub fn new<D>(display: &DisplayHandle, config: ZonesConfig) -> Self
    where
        D: GlobalDispatch<ExtZoneManagerV1, ()> + 'static,
    {
        let global = display.create_global::<D, ExtZoneManagerV1, _>(1, ());

        Self {
            zones: SlotMap::with_key(),
            items: SlotMap::with_key(),
            zones_by_handle: FxHashMap::default(),
            items_by_toplevel: FxHashMap::default(),
            config,
            global,
        }
    }

    /// Id of the `ext_zone_manager_v1` global.
    pub fn global(&self) -> GlobalId {
        self.global.clone()
    }

    /// The zone with the given key, if it is still alive.
    pub fn zone(&self, zone: ZoneId) -> Option<&Zone> {
        self.zones.get(zone)
    }

    /// The item with the given key, if it is still alive.
    pub fn item(&self, item: ItemId) -> Option<&ZoneItem> {
        self.items.get(item)
    }

    /// The zone registered under `handle`, if one has been created.
    pub fn zone_by_handle(&self, handle: &str) -> Option<ZoneId> {
        self.zones_by_handle.get(handle).copied()
    }

    /// The item bound to `toplevel`, if one has been created.
    pub fn item_for(&self, toplevel: &XdgToplevel) -> Option<ItemId> {
        self.items_by_toplevel.get(&toplevel.id()).copied()
    }

    /// Iterate over all live zones.
    pub fn zones(&self) -> impl Iterator<Item = (ZoneId, &Zone)> {
        self.zones.iter()
    }

    /// Zone keyed by an output's name, created on first lookup.
    pub(crate) fn zone_for_output(&mut self, name: &str, geometry: ScreenRect) -> ZoneId {
        if let Some(&zone) = self.zones_by_handle.get(name) {
            return zone;
        }

        let zone = self.zones.insert(Zone::new(name, geometry, ZoneSource::Output));
        self.zones_by_handle.insert(name.to_owned(), zone);
        debug!(handle = name, "created output zone");

        zone
    }

    /// Zone keyed by a configured handle, created on first lookup.
    ///
    /// A handle the configuration does not contain yet yields a zone with an empty
    /// area rather than an error; a later configuration change fills it in.
    pub(crate) fn zone_for_handle(&mut self, handle: &str) -> ZoneId {
        if let Some(&zone) = self.zones_by_handle.get(handle) {
            return zone;
        }

        let area = self.config.area(handle).unwrap_or_else(ScreenRect::zero);
        let zone = self.zones.insert(Zone::new(handle, area, ZoneSource::Config));
        self.zones_by_handle.insert(handle.to_owned(), zone);
        debug!(handle, "created config zone");

        zone
    }

    /// Item bound to `toplevel`, created on first lookup.
    pub(crate) fn item_for_toplevel(&mut self, toplevel: &XdgToplevel) -> ItemId {
        if let Some(&item) = self.items_by_toplevel.get(&toplevel.id()) {
            return item;
        }

        let item = self.items.insert(ZoneItem::new(toplevel.clone()));
        self.items_by_toplevel.insert(toplevel.id(), item);

        item
    }

    /// Register a new protocol handle for `zone` and describe the zone to it.
    pub(crate) fn bind_zone_instance(&mut self, zone: ZoneId, instance: ExtZoneV1) {
        if let Some(entry) = self.zones.get_mut(zone) {
            entry.describe(&instance);
            entry.instances.push(instance);
        }
    }

    /// Register a new protocol handle for `item`.
    pub(crate) fn bind_item_instance(&mut self, item: ItemId, instance: ExtZoneItemV1) {
        if let Some(entry) = self.items.get_mut(item) {
            entry.instances.push(instance);
        }
    }

    pub(crate) fn drop_zone_instance(&mut self, zone: ZoneId, resource: ObjectId) {
        if let Some(entry) = self.zones.get_mut(zone) {
            entry.instances.retain(|instance| instance.id() != resource);
        }
    }

    pub(crate) fn drop_item_instance(&mut self, item: ItemId, resource: ObjectId) {
        if let Some(entry) = self.items.get_mut(item) {
            entry.instances.retain(|instance| instance.id() != resource);
        }
    }

    /// Tell every client bound to `zone` that `item` entered it.
    ///
    /// An event referencing an item can only go to clients that own an object for the
    /// item; the rest are skipped. Handles are notified in bind order.
    pub(crate) fn broadcast_entered(&self, zone: ZoneId, item: ItemId) {
        let (Some(zone), Some(item)) = (self.zones.get(zone), self.items.get(item)) else {
            return;
        };

        for instance in &zone.instances {
            let Some(client) = instance.client().map(|client| client.id()) else {
                continue;
            };
            if let Some(reference) = item.instance_for(&client) {
                instance.item_entered(reference);
            }
        }
    }

    /// Tell every client bound to `zone` that `item` left it.
    pub(crate) fn broadcast_left(&self, zone: ZoneId, item: ItemId) {
        let (Some(zone), Some(item)) = (self.zones.get(zone), self.items.get(item)) else {
            return;
        };

        for instance in &zone.instances {
            let Some(client) = instance.client().map(|client| client.id()) else {
                continue;
            };
            if let Some(reference) = item.instance_for(&client) {
                instance.item_left(reference);
            }
        }
    }

    /// Route a new geometry for the output named `name` to its zone, if any.
    pub fn output_geometry_changed(&mut self, name: &str, geometry: ScreenRect) {
        let Some(&zone) = self.zones_by_handle.get(name) else {
            return;
        };
        if let Some(zone) = self.zones.get_mut(zone) {
            if zone.source == ZoneSource::Output {
                zone.update_area(geometry);
            }
        }
    }

    /// Swap in a new configuration and update every config sourced zone from it.
    ///
    /// Zones whose entry disappeared fall back to an empty area; they are not torn
    /// down. Zones whose area is unchanged see no events.
    pub fn reload_config(&mut self, config: ZonesConfig) {
        self.config = config;

        let updates: Vec<(ZoneId, ScreenRect)> = self
            .zones
            .iter()
            .filter(|(_, zone)| zone.source == ZoneSource::Config)
            .map(|(id, zone)| (id, self.config.area(zone.handle()).unwrap_or_else(ScreenRect::zero)))
            .collect();

        for (id, area) in updates {
            if let Some(zone) = self.zones.get_mut(id) {
                zone.update_area(area);
            }
        }
    }

    /// Tear down the zone backed by the output named `name`.
    ///
    /// Members are detached with their back-references cleared first, then the
    /// constraints among them are retracted. Protocol handles for the zone stay alive
    /// but inert; further requests on them fail the way stale handles do.
    pub fn output_removed<D: ZonesHandler>(state: &mut D, name: &str) {
        let zones = state.zones_state();

        let Some(&zone) = zones.zones_by_handle.get(name) else {
            return;
        };
        if zones.zones.get(zone).map(|zone| zone.source) != Some(ZoneSource::Output) {
            return;
        }

        zones.zones_by_handle.remove(name);
        let Some(removed) = zones.zones.remove(zone) else {
            return;
        };
        for &member in &removed.members {
            if let Some(item) = zones.items.get_mut(member) {
                item.zone = None;
            }
        }
        debug!(handle = name, "removed output zone");

        stacking::retract_all(state, &removed.members);
    }

    /// Tear down the item bound to `toplevel` after the toplevel was destroyed.
    ///
    /// The item leaves its zone the ordinary way, item_left notification and constraint
    /// retraction included, before its storage is released.
    pub fn toplevel_destroyed<D: ZonesHandler>(state: &mut D, toplevel: &XdgToplevel) {
        let zones = state.zones_state();

        let Some(item) = zones.items_by_toplevel.remove(&toplevel.id()) else {
            return;
        };

        if let Some(current) = zones.items.get(item).and_then(|entry| entry.zone) {
            zone::leave(state, current, item);
        }

        state.zones_state().items.remove(item);
    }
}

impl<D> GlobalDispatch<ExtZoneManagerV1, (), D> for ZonesState
where
    D: GlobalDispatch<ExtZoneManagerV1, ()> + Dispatch<ExtZoneManagerV1, ()> + ZonesHandler,
{
    fn bind(
        _state: &mut D,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<ExtZoneManagerV1>,
        _global_data: &(),
        data_init: &mut DataInit<'_, D>,
    ) {
        data_init.init(resource, ());
    }
}

impl<D> Dispatch<ExtZoneManagerV1, (), D> for ZonesState
where
    D: Dispatch<ExtZoneManagerV1, ()>
        + Dispatch<ExtZoneV1, ZoneId>
        + Dispatch<ExtZoneItemV1, ItemId>
        + ZonesHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        resource: &ExtZoneManagerV1,
        request: ext_zone_manager_v1::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        init: &mut DataInit<'_, D>,
    ) {
        match request {
            ext_zone_manager_v1::Request::Destroy => {}

            ext_zone_manager_v1::Request::GetZone { id, output } => match state.output_info(&output) {
                Some(info) => {
                    let zone = state.zones_state().zone_for_output(&info.name, info.geometry);
                    let instance = init.init(id, zone);
                    state.zones_state().bind_zone_instance(zone, instance);
                }
                None => {
                    init.init(id, ZoneId::default());
                    resource.post_error(ext_zone_manager_v1::Error::InvalidOutput, "unknown output");
                }
            },

            ext_zone_manager_v1::Request::GetZoneFromHandle { id, handle } => {
                if handle.is_empty() {
                    init.init(id, ZoneId::default());
                    resource.post_error(ext_zone_manager_v1::Error::InvalidHandle, "zone handle must not be empty");
                    return;
                }

                let zone = state.zones_state().zone_for_handle(&handle);
                let instance = init.init(id, zone);
                state.zones_state().bind_zone_instance(zone, instance);
            }

            ext_zone_manager_v1::Request::GetZoneItem { id, toplevel } => {
                let item = state.zones_state().item_for_toplevel(&toplevel);
                let instance = init.init(id, item);
                state.zones_state().bind_item_instance(item, instance);
            }
        }
    }
}

/// Route `ext-zones-v1` dispatch for `$ty` to its [`ZonesState`].
///
/// `$ty` must implement [`ZonesHandler`](crate::ZonesHandler).
#[macro_export]
macro_rules! delegate_ext_zones {
    ($ty: ty) => {
        $crate::wayland_server::delegate_global_dispatch!($ty: [
            $crate::protocol::ext_zone_manager_v1::ExtZoneManagerV1: ()
        ] => $crate::ZonesState);

        $crate::wayland_server::delegate_dispatch!($ty: [
            $crate::protocol::ext_zone_manager_v1::ExtZoneManagerV1: ()
        ] => $crate::ZonesState);

        $crate::wayland_server::delegate_dispatch!($ty: [
            $crate::protocol::ext_zone_v1::ExtZoneV1: $crate::ZoneId
        ] => $crate::ZonesState);

        $crate::wayland_server::delegate_dispatch!($ty: [
            $crate::protocol::ext_zone_item_v1::ExtZoneItemV1: $crate::ItemId
        ] => $crate::ZonesState);
    };
}
