use std::{
    collections::{HashMap, VecDeque},
    io,
    num::NonZeroU32,
    sync::atomic::{AtomicU32, Ordering},
};

use wayland_client::{
    backend::{ObjectId, WaylandError},
    globals::{registry_queue_init, BindError, GlobalError, GlobalListContents},
    protocol::{wl_output::WlOutput, wl_registry::WlRegistry},
    Connection, Dispatch, DispatchError, EventQueue, Proxy, QueueHandle,
};
use wayland_protocols::xdg::shell::client::xdg_toplevel::XdgToplevel;

use crate::{
    event::{Event, ItemEvent, ZoneEvent},
    id,
    protocol::{
        ext_zone_item_v1::ExtZoneItemV1,
        ext_zone_manager_v1::ExtZoneManagerV1,
        ext_zone_v1::{self, ExtZoneV1},
    },
    AlreadyDestroyed, InvalidHandle, ItemId, Setup, ZoneId,
};

/// The `ext_zone_manager_v1` version this library speaks.
const MANAGER_VERSION: u32 = 1;

static GENERATION: AtomicU32 = AtomicU32::new(1);

pub struct Inner {
    generation: NonZeroU32,
    serial: u32,

    manager: ExtZoneManagerV1,

    zones: HashMap<id::Zone, ZoneState>,
    zones_by_handle: HashMap<String, id::Zone>,
    zones_by_output: HashMap<ObjectId, id::Zone>,

    items: HashMap<id::Item, ItemState>,
    items_by_toplevel: HashMap<ObjectId, id::Item>,

    events: VecDeque<Event>,
}

struct ZoneState {
    zone: ExtZoneV1,
    handle: Option<String>,
    size: Option<(i32, i32)>,
    described: bool,
}

struct ItemState {
    item: ExtZoneItemV1,
    toplevel: ObjectId,
    zone: Option<id::Zone>,
    position: Option<(i32, i32)>,
}

impl Inner {
    pub fn new(conn: &Connection) -> Result<(Self, EventQueue<Self>), Setup> {
        let generation = GENERATION.fetch_add(1, Ordering::AcqRel);

        // The counter wrapping back to 0 means billions of instances came and went. Not a
        // situation we can recover from.
        let generation = NonZeroU32::new(generation).expect("Internal generation counter overflowed");

        let (globals, queue) = registry_queue_init::<Self>(conn).map_err(map_global)?;

        let bound = globals.bind::<ExtZoneManagerV1, _, _>(&queue.handle(), MANAGER_VERSION..=MANAGER_VERSION, ());
        let manager = match bound {
            Ok(manager) => manager,
            Err(BindError::NotPresent) => {
                return Err(Setup::MissingGlobal {
                    interface: ExtZoneManagerV1::interface().name,
                });
            }
            Err(BindError::UnsupportedVersion) => {
                let interface = ExtZoneManagerV1::interface().name;
                let available = globals
                    .contents()
                    .with_list(|globals| {
                        globals
                            .iter()
                            .filter(|global| global.interface == interface)
                            .map(|global| global.version)
                            .max()
                    })
                    .expect("unsupported version implies the global is advertised");

                return Err(Setup::IncompatibleVersion {
                    interface,
                    available,
                    compatible: MANAGER_VERSION..=MANAGER_VERSION,
                });
            }
        };

        let inner = Self {
            generation,
            serial: 0,
            manager,
            zones: HashMap::new(),
            zones_by_handle: HashMap::new(),
            zones_by_output: HashMap::new(),
            items: HashMap::new(),
            items_by_toplevel: HashMap::new(),
            events: VecDeque::new(),
        };

        Ok((inner, queue))
    }

    pub fn pop_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn zone_for_output(&mut self, output: &WlOutput, qh: &QueueHandle<Self>) -> ZoneId {
        if let Some(&existing) = self.zones_by_output.get(&output.id()) {
            return ZoneId(existing);
        }

        let key = self.next_zone();
        let zone = self.manager.get_zone(output, qh, key);

        self.zones.insert(
            key,
            ZoneState {
                zone,
                handle: None,
                size: None,
                described: false,
            },
        );
        self.zones_by_output.insert(output.id(), key);

        ZoneId(key)
    }

    pub fn zone_from_handle(&mut self, handle: &str, qh: &QueueHandle<Self>) -> Result<ZoneId, InvalidHandle> {
        if handle.is_empty() {
            return Err(InvalidHandle);
        }

        if let Some(&existing) = self.zones_by_handle.get(handle) {
            return Ok(ZoneId(existing));
        }

        let key = self.next_zone();
        let zone = self.manager.get_zone_from_handle(handle.to_owned(), qh, key);

        self.zones.insert(
            key,
            ZoneState {
                zone,
                handle: Some(handle.to_owned()),
                size: None,
                described: false,
            },
        );
        self.zones_by_handle.insert(handle.to_owned(), key);

        Ok(ZoneId(key))
    }

    pub fn item_for_toplevel(&mut self, toplevel: &XdgToplevel, qh: &QueueHandle<Self>) -> ItemId {
        if let Some(&existing) = self.items_by_toplevel.get(&toplevel.id()) {
            return ItemId(existing);
        }

        let key = id::Item {
            generation: self.generation,
            id: self.next_serial(),
        };
        let item = self.manager.get_zone_item(toplevel, qh, key);

        self.items.insert(
            key,
            ItemState {
                item,
                toplevel: toplevel.id(),
                zone: None,
                position: None,
            },
        );
        self.items_by_toplevel.insert(toplevel.id(), key);

        ItemId(key)
    }

    pub fn add_item(&self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        let (zone, item) = self.pair(zone, item)?;
        zone.zone.add_item(&item.item);
        Ok(())
    }

    pub fn remove_item(&self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        let (zone, item) = self.pair(zone, item)?;
        zone.zone.remove_item(&item.item);
        Ok(())
    }

    pub fn set_position(&self, zone: ZoneId, item: ItemId, x: i32, y: i32) -> Result<(), AlreadyDestroyed> {
        let (zone, item) = self.pair(zone, item)?;
        zone.zone.set_position(&item.item, x, y);
        Ok(())
    }

    pub fn request_position(&self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        let (zone, item) = self.pair(zone, item)?;
        zone.zone.get_position(&item.item);
        Ok(())
    }

    pub fn set_layer(&self, zone: ZoneId, item: ItemId, layer: i32) -> Result<(), AlreadyDestroyed> {
        let (zone, item) = self.pair(zone, item)?;
        zone.zone.set_layer(&item.item, layer);
        Ok(())
    }

    pub fn release_zone(&mut self, zone: ZoneId) -> Result<(), AlreadyDestroyed> {
        let state = self.zones.remove(&zone.0).ok_or(AlreadyDestroyed)?;
        state.zone.destroy();

        self.zones_by_handle.retain(|_, key| *key != zone.0);
        self.zones_by_output.retain(|_, key| *key != zone.0);

        Ok(())
    }

    pub fn release_item(&mut self, item: ItemId) -> Result<(), AlreadyDestroyed> {
        let state = self.items.remove(&item.0).ok_or(AlreadyDestroyed)?;
        state.item.destroy();

        self.items_by_toplevel.remove(&state.toplevel);

        Ok(())
    }

    pub fn zone_size(&self, zone: ZoneId) -> Option<(i32, i32)> {
        self.zones.get(&zone.0).and_then(|zone| zone.size)
    }

    pub fn zone_handle(&self, zone: ZoneId) -> Option<&str> {
        self.zones.get(&zone.0).and_then(|zone| zone.handle.as_deref())
    }

    pub fn item_zone(&self, item: ItemId) -> Option<ZoneId> {
        self.items.get(&item.0).and_then(|item| item.zone).map(ZoneId)
    }

    pub fn item_position(&self, item: ItemId) -> Option<(i32, i32)> {
        self.items.get(&item.0).and_then(|item| item.position)
    }

    fn pair(&self, zone: ZoneId, item: ItemId) -> Result<(&ZoneState, &ItemState), AlreadyDestroyed> {
        let zone = self.zones.get(&zone.0).ok_or(AlreadyDestroyed)?;
        let item = self.items.get(&item.0).ok_or(AlreadyDestroyed)?;
        Ok((zone, item))
    }

    fn next_zone(&mut self) -> id::Zone {
        id::Zone {
            generation: self.generation,
            id: self.next_serial(),
        }
    }

    fn next_serial(&mut self) -> NonZeroU32 {
        self.serial += 1;
        NonZeroU32::new(self.serial).expect("id counter overflowed")
    }
}

pub fn map_dispatch(err: DispatchError) -> io::Error {
    match err {
        DispatchError::Backend(WaylandError::Io(err)) => err,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

fn map_global(err: GlobalError) -> Setup {
    match err {
        GlobalError::Backend(WaylandError::Io(err)) => Setup::Io(err),
        other => Setup::Io(io::Error::new(io::ErrorKind::Other, other)),
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for Inner {
    fn event(
        _state: &mut Self,
        _proxy: &WlRegistry,
        _event: <WlRegistry as Proxy>::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtZoneManagerV1, ()> for Inner {
    fn event(
        _state: &mut Self,
        _proxy: &ExtZoneManagerV1,
        _event: <ExtZoneManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtZoneItemV1, id::Item> for Inner {
    fn event(
        _state: &mut Self,
        _proxy: &ExtZoneItemV1,
        _event: <ExtZoneItemV1 as Proxy>::Event,
        _data: &id::Item,
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtZoneV1, id::Zone> for Inner {
    fn event(
        state: &mut Self,
        _proxy: &ExtZoneV1,
        event: ext_zone_v1::Event,
        data: &id::Zone,
        _conn: &Connection,
        _queue: &QueueHandle<Self>,
    ) {
        match event {
            ext_zone_v1::Event::Size { width, height } => {
                let Some(zone) = state.zones.get_mut(data) else {
                    tracing::debug!(width, height, "size event for a released zone");
                    return;
                };

                zone.size = Some((width, height));
                if zone.described {
                    state.events.push_back(Event::Zone(ZoneEvent::Resized(ZoneId(*data))));
                }
            }
            ext_zone_v1::Event::Handle { handle } => {
                if let Some(zone) = state.zones.get_mut(data) {
                    zone.handle = Some(handle);
                }
            }
            ext_zone_v1::Event::Done => {
                let Some(zone) = state.zones.get_mut(data) else {
                    tracing::debug!("done event for a released zone");
                    return;
                };

                zone.described = true;
                state.events.push_back(Event::Zone(ZoneEvent::Described(ZoneId(*data))));
            }
            ext_zone_v1::Event::ItemEntered { item } => {
                let key = *item.data::<id::Item>().unwrap();
                if let Some(item) = state.items.get_mut(&key) {
                    item.zone = Some(*data);
                    state.events.push_back(Event::Item(ItemEvent::Entered {
                        item: ItemId(key),
                        zone: ZoneId(*data),
                    }));
                }
            }
            ext_zone_v1::Event::ItemLeft { item } => {
                let key = *item.data::<id::Item>().unwrap();
                if let Some(item) = state.items.get_mut(&key) {
                    item.zone = None;
                    item.position = None;
                    state.events.push_back(Event::Item(ItemEvent::Left {
                        item: ItemId(key),
                        zone: ZoneId(*data),
                    }));
                }
            }
            ext_zone_v1::Event::Position { item, x, y } => {
                let key = *item.data::<id::Item>().unwrap();
                if let Some(item) = state.items.get_mut(&key) {
                    item.position = Some((x, y));
                    state.events.push_back(Event::Item(ItemEvent::Position {
                        item: ItemId(key),
                        zone: ZoneId(*data),
                        x,
                        y,
                    }));
                }
            }
            ext_zone_v1::Event::PositionFailed { item } => {
                let key = *item.data::<id::Item>().unwrap();
                if state.items.contains_key(&key) {
                    state.events.push_back(Event::Item(ItemEvent::PositionFailed {
                        item: ItemId(key),
                        zone: ZoneId(*data),
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_io_errors_pass_through() {
        let err = map_dispatch(DispatchError::Backend(WaylandError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "gone",
        ))));

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn global_io_errors_pass_through() {
        let setup = map_global(GlobalError::Backend(WaylandError::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "no socket",
        ))));

        match setup {
            Setup::Io(err) => assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("unexpected setup error: {other:?}"),
        }
    }
}
