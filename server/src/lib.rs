//! Server side implementation of the `ext-zones-v1` protocol.
//!
//! The protocol lets clients discover named rectangular zones, place toplevel windows
//! into them, position those windows in zone-relative coordinates and declare a relative
//! stacking layer among windows sharing a zone. Zones are backed either by an output,
//! tracking its geometry, or by a handle defined in configuration.
//!
//! # Overview
//!
//! The engine lives in a [`ZonesState`] embedded in the compositor state. The compositor
//! implements [`ZonesHandler`] to let the engine inspect outputs and windows and to
//! enact movement and stacking decisions, and routes protocol dispatch to the engine
//! with [`delegate_ext_zones`].
//!
//! Everything runs on the compositor's event loop thread. The host forwards the
//! lifecycle it owns into the engine: output geometry changes and removals, toplevel
//! destruction and configuration reloads, through the methods on [`ZonesState`].
//! Configuration comes from a TOML file (see [`config::ZonesConfig`]) which can be
//! watched for changes with [`config::ConfigWatcher`] on a calloop event loop.
//!
//! Stacking never goes through a global order maintained here: the engine derives
//! pairwise "stacks below" edges from the layers of zone co-members and hands them to
//! the host, which owns actual restacking.

pub mod config;
mod error;
mod handler;
mod item;
pub mod protocol;
mod registry;
mod space;
mod stacking;
mod zone;

pub use error::ZoneError;
pub use handler::{OutputInfo, ZonesHandler};
pub use item::{ItemId, ZoneItem};
pub use registry::ZonesState;
pub use space::{Local, LocalPoint, Screen, ScreenPoint, ScreenRect, ScreenSize};
pub use zone::{Zone, ZoneId, ZoneSource};

pub use euclid;
pub use wayland_server;
