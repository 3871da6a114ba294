//! Zone definitions read from configuration.
//!
//! Config sourced zones take their area from a TOML file with one table per handle:
//!
//! ```toml
//! [zones.left-half]
//! x = 0
//! y = 0
//! width = 960
//! height = 1080
//! ```

use std::{fs, io, path::Path};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::space::{ScreenPoint, ScreenRect, ScreenSize};

mod watcher;

pub use watcher::{ConfigEvent, ConfigWatcher};

/// An error that may occur when loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
}

/// One configured zone rectangle. Missing fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ZoneEntry {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

/// The set of configured zones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZonesConfig {
    #[serde(default)]
    zones: FxHashMap<String, ZoneEntry>,
}

impl ZonesConfig {
    /// Load configuration from the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from `path`, treating a missing file as empty configuration.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// The configured area for `handle`, if the configuration has one.
    pub fn area(&self, handle: &str) -> Option<ScreenRect> {
        self.zones.get(handle).map(|entry| {
            ScreenRect::new(
                ScreenPoint::new(entry.x, entry.y),
                ScreenSize::new(entry.width, entry.height),
            )
        })
    }

    /// Insert or replace the entry for `handle`.
    pub fn insert(&mut self, handle: impl Into<String>, entry: ZoneEntry) {
        self.zones.insert(handle.into(), entry);
    }
}
