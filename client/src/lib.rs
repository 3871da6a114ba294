//! Client-side window zoning API
//!
//! Compositors supporting the `ext-zones-v1` protocol expose named rectangular zones that
//! toplevel windows can be placed into: one zone per output, or free-form regions defined
//! in compositor configuration and identified by a handle.
//!
//! This library provides an implementation of the protocol that manages the messiness
//! involved with implementing it yourself with the [wayland-client] crate.
//!
//! # Overview
//!
//! This library is based around the [`Zones`] type. In order to handle incoming and
//! outbound messages, you are expected to drive a [`Zones`] from your event loop, at its
//! simplest by calling [`Zones::blocking_dispatch`] repeatedly.
//!
//! An [`Event`] is the primary way through which your application gets updates from the
//! server: zone descriptions and size changes, membership changes, and position answers.
//! Drain them with [`Zones::read_event`] after each dispatch.
//!
//! Zones and items are referenced by [`ZoneId`] and [`ItemId`]. Requests naming an id that
//! was already released fail with [`AlreadyDestroyed`] instead of talking to the server.
//!
//! [wayland-client]: https://crates.io/crates/wayland-client

mod error;
mod event;
mod id;
pub mod protocol;
mod zones;

use std::io;

pub use error::*;
pub use event::*;

use wayland_client::{protocol::wl_output::WlOutput, Connection, EventQueue};
use wayland_protocols::xdg::shell::client::xdg_toplevel::XdgToplevel;

/// The object named by an id has already been released.
#[derive(Debug)]
pub struct AlreadyDestroyed;

/// A zone handle must not be empty.
#[derive(Debug)]
pub struct InvalidHandle;

/// A handle to the zoning capabilities of the display server.
pub struct Zones {
    inner: zones::Inner,
    queue: EventQueue<zones::Inner>,
}

impl Zones {
    /// Set up the zoning state on the given connection.
    ///
    /// This performs a blocking round trip to enumerate globals and binds the zone
    /// manager.
    pub fn new(conn: &Connection) -> Result<Self, Setup> {
        let (inner, queue) = zones::Inner::new(conn)?;
        Ok(Self { inner, queue })
    }

    pub fn blocking_dispatch(&mut self) -> io::Result<()> {
        self.queue
            .blocking_dispatch(&mut self.inner)
            .map_err(zones::map_dispatch)?;
        Ok(())
    }

    /// Read an event from the zoning state.
    ///
    /// Returns [`None`] if there are no more pending events.
    pub fn read_event(&mut self) -> Option<Event> {
        self.inner.pop_event()
    }

    /// The zone covering the given output.
    ///
    /// Repeated calls with the same output return the same id.
    pub fn zone_for_output(&mut self, output: &WlOutput) -> ZoneId {
        self.inner.zone_for_output(output, &self.queue.handle())
    }

    /// The zone identified by `handle`, as exchanged out of band or defined in compositor
    /// configuration.
    ///
    /// Repeated calls with the same handle return the same id.
    pub fn zone_from_handle(&mut self, handle: &str) -> Result<ZoneId, InvalidHandle> {
        self.inner.zone_from_handle(handle, &self.queue.handle())
    }

    /// The item representing the given toplevel in the zoning system.
    ///
    /// Repeated calls with the same toplevel return the same id.
    pub fn item_for_toplevel(&mut self, toplevel: &XdgToplevel) -> ItemId {
        self.inner.item_for_toplevel(toplevel, &self.queue.handle())
    }

    /// Place the item in the zone.
    ///
    /// Membership changes are reported back through [`ItemEvent::Entered`] and
    /// [`ItemEvent::Left`].
    pub fn add_item(&mut self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        self.inner.add_item(zone, item)
    }

    /// Remove the item from the zone.
    pub fn remove_item(&mut self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        self.inner.remove_item(zone, item)
    }

    /// Move the item's toplevel to (x, y) relative to the zone's top-left corner.
    ///
    /// The server answers with [`ItemEvent::PositionFailed`] if the position is not
    /// acceptable; a successful move is silent.
    pub fn set_position(&mut self, zone: ZoneId, item: ItemId, x: i32, y: i32) -> Result<(), AlreadyDestroyed> {
        self.inner.set_position(zone, item, x, y)
    }

    /// Ask for the item's current position within the zone.
    ///
    /// The server answers with [`ItemEvent::Position`] or [`ItemEvent::PositionFailed`].
    pub fn request_position(&mut self, zone: ZoneId, item: ItemId) -> Result<(), AlreadyDestroyed> {
        self.inner.request_position(zone, item)
    }

    /// Set the item's stacking layer within the zone.
    pub fn set_layer(&mut self, zone: ZoneId, item: ItemId, layer: i32) -> Result<(), AlreadyDestroyed> {
        self.inner.set_layer(zone, item, layer)
    }

    /// Release this client's object for the zone.
    ///
    /// The zone itself and its membership are unaffected.
    pub fn release_zone(&mut self, zone: ZoneId) -> Result<(), AlreadyDestroyed> {
        self.inner.release_zone(zone)
    }

    /// Release this client's object for the item.
    ///
    /// The item's zone membership and layer are unaffected.
    pub fn release_item(&mut self, item: ItemId) -> Result<(), AlreadyDestroyed> {
        self.inner.release_item(item)
    }

    /// The last reported size of the zone, if it has been described yet.
    pub fn zone_size(&self, zone: ZoneId) -> Option<(i32, i32)> {
        self.inner.zone_size(zone)
    }

    /// The handle naming the zone, if it has been described yet.
    pub fn zone_handle(&self, zone: ZoneId) -> Option<&str> {
        self.inner.zone_handle(zone)
    }

    /// The zone the item is currently a member of, as far as events have reported.
    pub fn item_zone(&self, item: ItemId) -> Option<ZoneId> {
        self.inner.item_zone(item)
    }

    /// The item's last reported zone-relative position.
    pub fn item_position(&self, item: ItemId) -> Option<(i32, i32)> {
        self.inner.item_position(item)
    }
}

/// id used to identify a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneId(id::Zone);

/// id used to identify a zone item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(id::Item);
