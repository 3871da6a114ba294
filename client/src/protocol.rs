//! Generated client bindings for the `ext-zones-v1` protocol.
//!
//! The protocol is not part of `wayland-protocols`, so the bindings are generated here
//! from the XML description. Everything under this module can be used as if it came from
//! `wayland_client::protocol`.

use wayland_client;

pub mod __interfaces {
    use wayland_client::protocol::__interfaces::*;
    use wayland_protocols::xdg::shell::client::__interfaces::*;
    wayland_scanner::generate_interfaces!("../protocols/ext-zones-v1.xml");
}
use self::__interfaces::*;

use wayland_client::protocol::*;
use wayland_protocols::xdg::shell::client::*;

wayland_scanner::generate_client_code!("../protocols/ext-zones-v1.xml");
