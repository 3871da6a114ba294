//! The glue between the zone engine and the host compositor.

use wayland_protocols::xdg::shell::server::xdg_toplevel::XdgToplevel;
use wayland_server::protocol::wl_output::WlOutput;

use crate::{
    registry::ZonesState,
    space::{ScreenPoint, ScreenRect},
};

/// Properties of an output as known to the host compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    /// Name of the output, such as `DP-1`.
    pub name: String,

    /// Position and size of the output in the global space.
    pub geometry: ScreenRect,
}

/// Hooks the zone engine needs from the host compositor.
///
/// The compositor state implements this trait and routes protocol dispatch to the engine
/// with [`delegate_ext_zones`](crate::delegate_ext_zones). The engine calls back into the
/// host through these methods to inspect outputs and windows and to enact movement and
/// stacking decisions.
pub trait ZonesHandler {
    /// The zone engine state kept inside the compositor state.
    fn zones_state(&mut self) -> &mut ZonesState;

    /// Look up the name and geometry of an output.
    ///
    /// Returning [`None`] marks the output as unknown, which makes `get_zone` raise a
    /// protocol error on the requesting client.
    fn output_info(&mut self, output: &WlOutput) -> Option<OutputInfo>;

    /// Current frame geometry of a toplevel in the global space.
    ///
    /// [`None`] means the window is gone from the host's point of view. The engine then
    /// skips the window where it can and reports failure where it cannot.
    fn window_geometry(&mut self, toplevel: &XdgToplevel) -> Option<ScreenRect>;

    /// Move the frame of a toplevel so its top-left corner sits at `position`.
    fn move_window(&mut self, toplevel: &XdgToplevel, position: ScreenPoint);

    /// Called once before a batch of stacking constraint changes.
    fn begin_stacking_update(&mut self) {}

    /// Called once after a batch of stacking constraint changes.
    fn end_stacking_update(&mut self) {}

    /// Require `below` to stack beneath `above` until retracted.
    fn constrain(&mut self, below: &XdgToplevel, above: &XdgToplevel);

    /// Retract a constraint previously installed with
    /// [`constrain`](ZonesHandler::constrain).
    ///
    /// The engine may retract pairs that were never installed. Implementations must
    /// treat that as a no-op.
    fn unconstrain(&mut self, below: &XdgToplevel, above: &XdgToplevel);
}
