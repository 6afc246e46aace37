// # shush-core
//
// Core library for geofence-driven ringer mode switching.
//
// ## Architecture Overview
//
// This library owns the geofence lifecycle and the transition handling:
// - **GeofenceFactory**: Converts place records into geofence definitions
// - **GeofenceRegistry**: Keeps the desired geofence set and submits it to a
//   `RegionMonitor` under a single `CallbackTarget`
// - **TransitionDispatcher**: Turns ENTER/EXIT transitions into a ringer mode
//   change followed by a notification
// - **ShushEngine**: Event loop that plays the role of the single main
//   execution context (connection callbacks, transitions, outcomes)
//
// Everything platform-specific (location service, audio policy, notification
// posting, place lookup) sits behind the traits in [`traits`].
//
// ## Design Principles
//
// 1. **Non-blocking**: register/unregister return immediately, outcomes arrive
//    on a channel
// 2. **Non-fatal**: authorization gaps, service rejections and unknown
//    transitions are logged and absorbed
// 3. **Library-First**: the daemon is a thin integration layer

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod geofence;
pub mod places;
pub mod registry;
pub mod traits;
pub mod transition;

// Re-export core types for convenience
pub use config::{EngineConfig, NotificationConfig, ShushConfig};
pub use dispatcher::{DispatchOutcome, TransitionDispatcher};
pub use engine::{Collaborators, EngineEvent, PlatformEvent, ShushEngine};
pub use error::{Error, Result};
pub use geofence::{GeofenceDefinition, GeofenceFactory, GeofencePolicy, GeofencingRequest, Place};
pub use places::{JsonFilePlaceSource, StaticPlaceSource};
pub use registry::{
    CallbackTarget, GeofenceRegistry, Operation, RegistrationOutcome, RegistryState, SkipReason,
    SubmitAck,
};
pub use traits::{
    AudioPolicy, LocationAuthorization, NotificationPresenter, PlaceSource, RegionMonitor,
    RingerController,
};
pub use transition::{TransitionEvent, TransitionKind, TransitionPayload};
