use std::{error::Error, fmt, io, ops::RangeInclusive};

/// Errors that can occur when creating a [`Zones`].
///
/// [`Zones`]: crate::Zones
#[derive(Debug)]
pub enum Setup {
    /// The `ext_zone_manager_v1` global is not available.
    ///
    /// This may indicate the compositor does not support the zones protocol.
    MissingGlobal {
        /// Name of the interface.
        interface: &'static str,
    },

    /// The global is available, but not at a version this library can speak.
    IncompatibleVersion {
        /// Name of the interface.
        interface: &'static str,

        /// Advertised version.
        available: u32,

        /// The compatible versions.
        compatible: RangeInclusive<u32>,
    },

    /// An [`io::Error`].
    Io(io::Error),
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setup::MissingGlobal { interface } => write!(f, "required global \"{interface}\" is missing"),
            Setup::IncompatibleVersion {
                interface,
                available,
                compatible,
            } => write!(
                f,
                "global \"{interface}\" is advertised at version {available}, but only {}..={} is supported",
                compatible.start(),
                compatible.end()
            ),
            Setup::Io(ref io) => fmt::Display::fmt(io, f),
        }
    }
}

impl Error for Setup {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Setup::Io(ref io) => Some(io),
            _ => None,
        }
    }
}
