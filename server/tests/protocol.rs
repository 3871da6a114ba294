//! Wire tests: a real client driving the zone engine over a socketpair.
//!
//! The server half embeds the engine in a minimal compositor state with stub globals
//! for wl_compositor, xdg_wm_base and wl_output. The client half records every zone
//! event it receives so tests can assert exact sequences.

use std::collections::HashSet;

use wayland_client::{
    backend::protocol::ProtocolError,
    protocol::{wl_compositor::WlCompositor, wl_registry::WlRegistry},
    Connection, EventQueue, Proxy,
};
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use ext_zones_client::protocol::ext_zone_manager_v1::ExtZoneManagerV1;
use ext_zones_server::{
    config::{ZoneEntry, ZonesConfig},
    ScreenPoint, ScreenRect, ScreenSize,
};

use client::ZoneEvent;

fn rect(x: i32, y: i32, width: i32, height: i32) -> ScreenRect {
    ScreenRect::new(ScreenPoint::new(x, y), ScreenSize::new(width, height))
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

mod server {
    use std::collections::HashSet;
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;

    use rustc_hash::FxHashMap;
    use wayland_protocols::xdg::shell::server::{
        xdg_surface::{self, XdgSurface},
        xdg_toplevel::{self, XdgToplevel},
        xdg_wm_base::{self, XdgWmBase},
    };
    use wayland_server::{
        backend::{ClientData, ObjectId},
        protocol::{
            wl_compositor::{self, WlCompositor},
            wl_output::{self, WlOutput},
            wl_surface::{self, WlSurface},
        },
        Client, DataInit, Dispatch, Display, DisplayHandle, GlobalDispatch, New, Resource,
    };

    use ext_zones_server::{
        config::ZonesConfig, delegate_ext_zones, OutputInfo, ScreenPoint, ScreenRect, ZonesHandler, ZonesState,
    };

    /// The compositor under test: the zone engine plus just enough shell to own
    /// toplevels and outputs.
    pub struct TestComp {
        pub zones: ZonesState,

        /// Frame geometry per toplevel, in creation order of the keys in `toplevels`.
        pub windows: FxHashMap<ObjectId, ScreenRect>,

        /// Server side ids of created toplevels, in creation order.
        pub toplevels: Vec<ObjectId>,

        /// Outputs the compositor considers alive.
        pub outputs: HashSet<ObjectId>,

        /// Constraints currently in force, as (below, above).
        pub active: HashSet<(ObjectId, ObjectId)>,
    }

    pub struct Server {
        pub display: Display<TestComp>,
        pub state: TestComp,
    }

    pub fn new(config: ZonesConfig) -> (Server, UnixStream) {
        let display = Display::<TestComp>::new().unwrap();
        let mut handle = display.handle();

        handle.create_global::<TestComp, WlCompositor, _>(1, ());
        handle.create_global::<TestComp, XdgWmBase, _>(1, ());
        handle.create_global::<TestComp, WlOutput, _>(1, ());

        let state = TestComp {
            zones: ZonesState::new::<TestComp>(&handle, config),
            windows: FxHashMap::default(),
            toplevels: Vec::new(),
            outputs: HashSet::new(),
            active: HashSet::new(),
        };

        let (local, remote) = UnixStream::pair().unwrap();
        handle.insert_client(remote, Arc::new(ClientState)).unwrap();

        (Server { display, state }, local)
    }

    impl ZonesHandler for TestComp {
        fn zones_state(&mut self) -> &mut ZonesState {
            &mut self.zones
        }

        fn output_info(&mut self, output: &WlOutput) -> Option<OutputInfo> {
            self.outputs.contains(&output.id()).then(|| OutputInfo {
                name: "DP-1".into(),
                geometry: super::rect(0, 0, 1920, 1080),
            })
        }

        fn window_geometry(&mut self, toplevel: &XdgToplevel) -> Option<ScreenRect> {
            self.windows.get(&toplevel.id()).copied()
        }

        fn move_window(&mut self, toplevel: &XdgToplevel, position: ScreenPoint) {
            if let Some(frame) = self.windows.get_mut(&toplevel.id()) {
                frame.origin = position;
            }
        }

        fn constrain(&mut self, below: &XdgToplevel, above: &XdgToplevel) {
            self.active.insert((below.id(), above.id()));
        }

        fn unconstrain(&mut self, below: &XdgToplevel, above: &XdgToplevel) {
            self.active.remove(&(below.id(), above.id()));
        }
    }

    delegate_ext_zones!(TestComp);

    struct ClientState;
    impl ClientData for ClientState {}

    impl GlobalDispatch<WlCompositor, ()> for TestComp {
        fn bind(
            _state: &mut Self,
            _handle: &DisplayHandle,
            _client: &Client,
            resource: New<WlCompositor>,
            _global_data: &(),
            data_init: &mut DataInit<'_, Self>,
        ) {
            data_init.init(resource, ());
        }
    }

    impl Dispatch<WlCompositor, ()> for TestComp {
        fn request(
            _state: &mut Self,
            _client: &Client,
            _resource: &WlCompositor,
            request: wl_compositor::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            init: &mut DataInit<'_, Self>,
        ) {
            match request {
                wl_compositor::Request::CreateSurface { id } => {
                    init.init(id, ());
                }
                _ => {}
            }
        }
    }

    impl Dispatch<WlSurface, ()> for TestComp {
        fn request(
            _state: &mut Self,
            _client: &Client,
            _resource: &WlSurface,
            _request: wl_surface::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            _init: &mut DataInit<'_, Self>,
        ) {
        }
    }

    impl GlobalDispatch<XdgWmBase, ()> for TestComp {
        fn bind(
            _state: &mut Self,
            _handle: &DisplayHandle,
            _client: &Client,
            resource: New<XdgWmBase>,
            _global_data: &(),
            data_init: &mut DataInit<'_, Self>,
        ) {
            data_init.init(resource, ());
        }
    }

    impl Dispatch<XdgWmBase, ()> for TestComp {
        fn request(
            _state: &mut Self,
            _client: &Client,
            _resource: &XdgWmBase,
            request: xdg_wm_base::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            init: &mut DataInit<'_, Self>,
        ) {
            match request {
                xdg_wm_base::Request::GetXdgSurface { id, surface: _ } => {
                    init.init(id, ());
                }
                _ => {}
            }
        }
    }

    impl Dispatch<XdgSurface, ()> for TestComp {
        fn request(
            state: &mut Self,
            _client: &Client,
            _resource: &XdgSurface,
            request: xdg_surface::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            init: &mut DataInit<'_, Self>,
        ) {
            match request {
                xdg_surface::Request::GetToplevel { id } => {
                    let toplevel = init.init(id, ());
                    state.windows.insert(toplevel.id(), super::rect(0, 0, 400, 300));
                    state.toplevels.push(toplevel.id());
                }
                _ => {}
            }
        }
    }

    impl Dispatch<XdgToplevel, ()> for TestComp {
        fn request(
            state: &mut Self,
            _client: &Client,
            resource: &XdgToplevel,
            request: xdg_toplevel::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            _init: &mut DataInit<'_, Self>,
        ) {
            match request {
                xdg_toplevel::Request::Destroy => {
                    ZonesState::toplevel_destroyed(state, resource);
                    state.windows.remove(&resource.id());
                }
                _ => {}
            }
        }
    }

    impl GlobalDispatch<WlOutput, ()> for TestComp {
        fn bind(
            state: &mut Self,
            _handle: &DisplayHandle,
            _client: &Client,
            resource: New<WlOutput>,
            _global_data: &(),
            data_init: &mut DataInit<'_, Self>,
        ) {
            let output = data_init.init(resource, ());
            state.outputs.insert(output.id());
        }
    }

    impl Dispatch<WlOutput, ()> for TestComp {
        fn request(
            _state: &mut Self,
            _client: &Client,
            _resource: &WlOutput,
            _request: wl_output::Request,
            _data: &(),
            _dhandle: &DisplayHandle,
            _init: &mut DataInit<'_, Self>,
        ) {
        }
    }
}

mod client {
    use wayland_client::{
        backend::ObjectId,
        protocol::{
            wl_callback::{self, WlCallback},
            wl_compositor::WlCompositor,
            wl_output::WlOutput,
            wl_registry::{self, WlRegistry},
            wl_surface::WlSurface,
        },
        Connection, Dispatch, Proxy, QueueHandle,
    };
    use wayland_protocols::xdg::shell::client::{
        xdg_surface::{self, XdgSurface},
        xdg_toplevel::XdgToplevel,
        xdg_wm_base::{self, XdgWmBase},
    };

    use ext_zones_client::protocol::{
        ext_zone_item_v1::ExtZoneItemV1,
        ext_zone_manager_v1::ExtZoneManagerV1,
        ext_zone_v1::{self, ExtZoneV1},
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ZoneEvent {
        Size(i32, i32),
        Handle(String),
        Done,
        Entered(ObjectId),
        Left(ObjectId),
        Position(ObjectId, i32, i32),
        Failed(ObjectId),
    }

    #[derive(Default)]
    pub struct TestApp {
        /// Advertised globals as (name, interface, version).
        pub globals: Vec<(u32, String, u32)>,

        /// Zone events in arrival order, keyed by the zone object.
        pub zone_events: Vec<(ObjectId, ZoneEvent)>,

        pub syncs: u32,
    }

    impl TestApp {
        /// The events received on one zone object, in order.
        pub fn events_for(&self, zone: &ExtZoneV1) -> Vec<ZoneEvent> {
            self.zone_events
                .iter()
                .filter(|(id, _)| *id == zone.id())
                .map(|(_, event)| event.clone())
                .collect()
        }
    }

    /// Bind the sole advertised global of interface `I`.
    pub fn bind<I>(registry: &WlRegistry, globals: &[(u32, String, u32)], qh: &QueueHandle<TestApp>) -> I
    where
        I: Proxy + 'static,
        TestApp: Dispatch<I, ()>,
    {
        let (name, _, version) = globals
            .iter()
            .find(|(_, interface, _)| interface.as_str() == I::interface().name)
            .expect("global not advertised")
            .clone();

        registry.bind(name, version, qh, ())
    }

    impl Dispatch<WlRegistry, ()> for TestApp {
        fn event(
            state: &mut Self,
            _proxy: &WlRegistry,
            event: wl_registry::Event,
            _data: &(),
            _conn: &Connection,
            _qhandle: &QueueHandle<Self>,
        ) {
            match event {
                wl_registry::Event::Global { name, interface, version } => {
                    state.globals.push((name, interface, version));
                }
                _ => {}
            }
        }
    }

    impl Dispatch<WlCallback, ()> for TestApp {
        fn event(
            state: &mut Self,
            _proxy: &WlCallback,
            event: wl_callback::Event,
            _data: &(),
            _conn: &Connection,
            _qhandle: &QueueHandle<Self>,
        ) {
            match event {
                wl_callback::Event::Done { .. } => state.syncs += 1,
                _ => {}
            }
        }
    }

    impl Dispatch<ExtZoneV1, ()> for TestApp {
        fn event(
            state: &mut Self,
            proxy: &ExtZoneV1,
            event: ext_zone_v1::Event,
            _data: &(),
            _conn: &Connection,
            _qhandle: &QueueHandle<Self>,
        ) {
            let entry = match event {
                ext_zone_v1::Event::Size { width, height } => ZoneEvent::Size(width, height),
                ext_zone_v1::Event::Handle { handle } => ZoneEvent::Handle(handle),
                ext_zone_v1::Event::Done => ZoneEvent::Done,
                ext_zone_v1::Event::ItemEntered { item } => ZoneEvent::Entered(item.id()),
                ext_zone_v1::Event::ItemLeft { item } => ZoneEvent::Left(item.id()),
                ext_zone_v1::Event::Position { item, x, y } => ZoneEvent::Position(item.id(), x, y),
                ext_zone_v1::Event::PositionFailed { item } => ZoneEvent::Failed(item.id()),
                _ => return,
            };
            state.zone_events.push((proxy.id(), entry));
        }
    }

    impl Dispatch<XdgWmBase, ()> for TestApp {
        fn event(
            _state: &mut Self,
            proxy: &XdgWmBase,
            event: xdg_wm_base::Event,
            _data: &(),
            _conn: &Connection,
            _qhandle: &QueueHandle<Self>,
        ) {
            match event {
                xdg_wm_base::Event::Ping { serial } => proxy.pong(serial),
                _ => {}
            }
        }
    }

    impl Dispatch<XdgSurface, ()> for TestApp {
        fn event(
            _state: &mut Self,
            proxy: &XdgSurface,
            event: xdg_surface::Event,
            _data: &(),
            _conn: &Connection,
            _qhandle: &QueueHandle<Self>,
        ) {
            match event {
                xdg_surface::Event::Configure { serial } => proxy.ack_configure(serial),
                _ => {}
            }
        }
    }

    macro_rules! ignore_events {
        ($($iface:ty),+ $(,)?) => {
            $(
                impl Dispatch<$iface, ()> for TestApp {
                    fn event(
                        _state: &mut Self,
                        _proxy: &$iface,
                        _event: <$iface as Proxy>::Event,
                        _data: &(),
                        _conn: &Connection,
                        _qhandle: &QueueHandle<Self>,
                    ) {
                    }
                }
            )+
        };
    }

    ignore_events!(WlCompositor, WlSurface, WlOutput, XdgToplevel, ExtZoneManagerV1, ExtZoneItemV1);
}

struct Pair {
    server: server::Server,
    conn: Connection,
    queue: EventQueue<client::TestApp>,
    app: client::TestApp,
    registry: WlRegistry,
}

fn setup(config: ZonesConfig) -> Pair {
    init_logging();

    let (server, stream) = server::new(config);
    let conn = Connection::from_socket(stream).unwrap();
    let queue = conn.new_event_queue();
    let registry = conn.display().get_registry(&queue.handle(), ());

    let mut pair = Pair {
        server,
        conn,
        queue,
        app: client::TestApp::default(),
        registry,
    };
    pair.roundtrip();
    pair
}

impl Pair {
    /// Flush client requests through the server and read back every event it produced.
    ///
    /// Both halves live on one thread, so this pumps the two queues by hand until a
    /// sync callback comes back instead of blocking on either side.
    fn roundtrip(&mut self) {
        let target = self.app.syncs + 1;
        self.conn.display().sync(&self.queue.handle(), ());

        for _ in 0..100 {
            self.conn.flush().unwrap();
            self.server.display.dispatch_clients(&mut self.server.state).unwrap();
            self.server.display.flush_clients().unwrap();

            if let Some(guard) = self.queue.prepare_read() {
                let _ = guard.read();
            }
            self.queue.dispatch_pending(&mut self.app).unwrap();

            if self.app.syncs >= target {
                return;
            }
        }

        panic!("roundtrip never completed");
    }

    /// Pump both sides, tolerating failures, until the client observes a protocol error.
    fn pump_until_error(&mut self) -> ProtocolError {
        for _ in 0..100 {
            let _ = self.conn.flush();
            let _ = self.server.display.dispatch_clients(&mut self.server.state);
            let _ = self.server.display.flush_clients();

            if let Some(guard) = self.queue.prepare_read() {
                let _ = guard.read();
            }
            let _ = self.queue.dispatch_pending(&mut self.app);

            if let Some(error) = self.conn.protocol_error() {
                return error;
            }
        }

        panic!("expected a protocol error");
    }
}

#[test]
fn zone_bind_describes_size_handle_done() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    let output = client::bind(&pair.registry, &pair.app.globals, &qh);
    let zone = manager.get_zone(&output, &qh, ());
    pair.roundtrip();

    assert_eq!(
        pair.app.events_for(&zone),
        [
            ZoneEvent::Size(1920, 1080),
            ZoneEvent::Handle("DP-1".into()),
            ZoneEvent::Done,
        ]
    );
}

#[test]
fn config_placeholder_fills_in_on_reload() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    let left = manager.get_zone_from_handle("left-half".into(), &qh, ());
    let right = manager.get_zone_from_handle("right-half".into(), &qh, ());
    pair.roundtrip();

    assert_eq!(
        pair.app.events_for(&left),
        [
            ZoneEvent::Size(0, 0),
            ZoneEvent::Handle("left-half".into()),
            ZoneEvent::Done,
        ]
    );

    let mut config = ZonesConfig::default();
    config.insert(
        "left-half",
        ZoneEntry {
            x: 0,
            y: 0,
            width: 960,
            height: 1080,
        },
    );
    pair.server.state.zones.reload_config(config);
    pair.roundtrip();

    let left_events = pair.app.events_for(&left);
    assert_eq!(
        left_events,
        [
            ZoneEvent::Size(0, 0),
            ZoneEvent::Handle("left-half".into()),
            ZoneEvent::Done,
            ZoneEvent::Size(960, 1080),
        ]
    );
    assert_eq!(
        left_events.iter().filter(|&event| *event == ZoneEvent::Done).count(),
        1,
        "done only closes the initial description"
    );
    assert_eq!(
        pair.app.events_for(&right).len(),
        3,
        "an unrelated key stays silent"
    );

    // Moving the zone without resizing it changes relative positions, not the size.
    let mut config = ZonesConfig::default();
    config.insert(
        "left-half",
        ZoneEntry {
            x: 100,
            y: 0,
            width: 960,
            height: 1080,
        },
    );
    pair.server.state.zones.reload_config(config);
    pair.roundtrip();
    assert_eq!(
        pair.app.events_for(&left).len(),
        4,
        "an origin-only change emits nothing"
    );
}

#[test]
fn items_enter_position_and_leave() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    let output = client::bind(&pair.registry, &pair.app.globals, &qh);
    let compositor: WlCompositor = client::bind(&pair.registry, &pair.app.globals, &qh);
    let wm_base: XdgWmBase = client::bind(&pair.registry, &pair.app.globals, &qh);

    let surface = compositor.create_surface(&qh, ());
    let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
    let toplevel = xdg_surface.get_toplevel(&qh, ());
    let item = manager.get_zone_item(&toplevel, &qh, ());
    let zone = manager.get_zone(&output, &qh, ());
    pair.roundtrip();

    zone.add_item(&item);
    pair.roundtrip();
    assert!(pair.app.events_for(&zone).contains(&ZoneEvent::Entered(item.id())));

    zone.set_position(&item, 100, 200);
    zone.get_position(&item);
    pair.roundtrip();
    let events = pair.app.events_for(&zone);
    assert_eq!(events.last(), Some(&ZoneEvent::Position(item.id(), 100, 200)));
    let server_toplevel = pair.server.state.toplevels[0].clone();
    assert_eq!(
        pair.server.state.windows[&server_toplevel].origin,
        ScreenPoint::new(100, 200)
    );

    zone.set_position(&item, 5000, 0);
    zone.get_position(&item);
    pair.roundtrip();
    let events = pair.app.events_for(&zone);
    assert_eq!(
        &events[events.len() - 2..],
        [
            ZoneEvent::Failed(item.id()),
            ZoneEvent::Position(item.id(), 100, 200),
        ],
        "a rejected move leaves the window in place"
    );

    zone.remove_item(&item);
    pair.roundtrip();
    assert_eq!(pair.app.events_for(&zone).last(), Some(&ZoneEvent::Left(item.id())));
}

#[test]
fn stacking_follows_layers_over_the_wire() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    let output = client::bind(&pair.registry, &pair.app.globals, &qh);
    let compositor: WlCompositor = client::bind(&pair.registry, &pair.app.globals, &qh);
    let wm_base: XdgWmBase = client::bind(&pair.registry, &pair.app.globals, &qh);

    let zone = manager.get_zone(&output, &qh, ());

    let surface_a = compositor.create_surface(&qh, ());
    let xdg_a = wm_base.get_xdg_surface(&surface_a, &qh, ());
    let toplevel_a = xdg_a.get_toplevel(&qh, ());
    let item_a = manager.get_zone_item(&toplevel_a, &qh, ());

    let surface_b = compositor.create_surface(&qh, ());
    let xdg_b = wm_base.get_xdg_surface(&surface_b, &qh, ());
    let toplevel_b = xdg_b.get_toplevel(&qh, ());
    let item_b = manager.get_zone_item(&toplevel_b, &qh, ());

    zone.add_item(&item_a);
    zone.add_item(&item_b);
    zone.set_layer(&item_b, 1);
    pair.roundtrip();

    let a = pair.server.state.toplevels[0].clone();
    let b = pair.server.state.toplevels[1].clone();
    assert_eq!(pair.server.state.active, HashSet::from([(a.clone(), b.clone())]));

    zone.set_layer(&item_a, 2);
    pair.roundtrip();
    assert_eq!(pair.server.state.active, HashSet::from([(b.clone(), a.clone())]));

    zone.set_layer(&item_a, 1);
    pair.roundtrip();
    assert!(pair.server.state.active.is_empty());

    // Destroying a toplevel tears its item down and notifies bound clients.
    zone.set_layer(&item_a, 0);
    pair.roundtrip();
    assert_eq!(pair.server.state.active.len(), 1);

    toplevel_a.destroy();
    pair.roundtrip();
    assert!(pair.server.state.active.is_empty());
    assert_eq!(pair.app.events_for(&zone).last(), Some(&ZoneEvent::Left(item_a.id())));
}

#[test]
fn unknown_output_is_a_protocol_error() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    let output = client::bind(&pair.registry, &pair.app.globals, &qh);
    pair.roundtrip();

    // The compositor forgot the output; binding a zone to it is a client error.
    pair.server.state.outputs.clear();
    manager.get_zone(&output, &qh, ());

    let error = pair.pump_until_error();
    assert_eq!(error.code, 0, "ext_zone_manager_v1 error invalid_output");
}

#[test]
fn empty_handle_is_a_protocol_error() {
    let mut pair = setup(ZonesConfig::default());
    let qh = pair.queue.handle();

    let manager: ExtZoneManagerV1 = client::bind(&pair.registry, &pair.app.globals, &qh);
    manager.get_zone_from_handle(String::new(), &qh, ());

    let error = pair.pump_until_error();
    assert_eq!(error.code, 1, "ext_zone_manager_v1 error invalid_handle");
}
