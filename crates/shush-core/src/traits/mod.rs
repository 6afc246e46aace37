//! Core traits for the shush system
//!
//! Every platform collaborator the core talks to sits behind one of these:
//!
//! - [`RegionMonitor`]: Registers and removes geofences with the location service
//! - [`PlaceSource`]: Supplies the user's places
//! - [`LocationAuthorization`]: Location-access check and request
//! - [`AudioPolicy`]: "May this process change the ringer mode right now?"
//! - [`RingerController`]: Applies a ringer mode
//! - [`NotificationPresenter`]: Posts the transition notification

pub mod authorization;
pub mod notifier;
pub mod place_source;
pub mod region_monitor;
pub mod ringer;

pub use authorization::{AudioPolicy, LocationAuthorization, StaticAudioPolicy};
pub use notifier::{Notification, NotificationIcon, NotificationPresenter};
pub use place_source::PlaceSource;
pub use region_monitor::{CallbackTarget, PendingStatus, RegionMonitor};
pub use ringer::{RingerController, RingerMode};
