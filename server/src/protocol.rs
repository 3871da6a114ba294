//! Generated server bindings for the `ext-zones-v1` protocol.
//!
//! The protocol is not part of `wayland-protocols`, so the bindings are generated here
//! from the XML description. Everything under this module can be used as if it came from
//! `wayland_server::protocol`.

use wayland_server;

pub mod __interfaces {
    use wayland_protocols::xdg::shell::server::__interfaces::*;
    use wayland_server::protocol::__interfaces::*;
    wayland_scanner::generate_interfaces!("../protocols/ext-zones-v1.xml");
}
use self::__interfaces::*;

use wayland_protocols::xdg::shell::server::*;
use wayland_server::protocol::*;

wayland_scanner::generate_server_code!("../protocols/ext-zones-v1.xml");
