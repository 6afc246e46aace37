// # Ringer Controller Trait
//
// Applies the device-wide ringer mode. The dispatcher checks
// [`AudioPolicy`](super::AudioPolicy) before calling in; an implementation
// may still refuse with `Error::AuthorizationMissing` if the grant was lost
// in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-wide audio output policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingerMode {
    Silent,
    Normal,
}

impl fmt::Display for RingerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingerMode::Silent => f.write_str("silent"),
            RingerMode::Normal => f.write_str("normal"),
        }
    }
}

/// Trait for ringer controller implementations
///
/// Must return quickly; it runs inside transition dispatch.
pub trait RingerController: Send + Sync {
    fn set_mode(&self, mode: RingerMode) -> Result<(), crate::Error>;
}
