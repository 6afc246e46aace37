//! Configuration types for the shush system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::geofence::GeofencePolicy;
use serde::{Deserialize, Serialize};

/// Main shush configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShushConfig {
    /// Radius, lifetime and triggers applied to every geofence
    #[serde(default)]
    pub geofence: GeofencePolicy,

    /// Text and slot of the transition notification
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ShushConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.geofence.validate()?;
        self.notification.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Slot reused for every transition notification
    #[serde(default = "default_notification_id")]
    pub notification_id: i32,

    #[serde(default = "default_title")]
    pub title: String,

    /// Body posted on ENTER
    #[serde(default = "default_entering_text")]
    pub entering_text: String,

    /// Body posted on EXIT
    #[serde(default = "default_exiting_text")]
    pub exiting_text: String,
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::config("Notification title cannot be empty"));
        }
        if self.entering_text.trim().is_empty() || self.exiting_text.trim().is_empty() {
            return Err(crate::Error::config("Notification text cannot be empty"));
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notification_id: default_notification_id(),
            title: default_title(),
            entering_text: default_entering_text(),
            exiting_text: default_exiting_text(),
        }
    }
}

fn default_notification_id() -> i32 {
    137
}

fn default_title() -> String {
    "Geofence Transition".to_string()
}

fn default_entering_text() -> String {
    "Entering geofence".to_string()
}

fn default_exiting_text() -> String {
    "Exiting geofence".to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether geofences are registered at all
    ///
    /// When false the engine keeps the desired set up to date but only ever
    /// unregisters.
    #[serde(default = "default_geofencing_enabled")]
    pub geofencing_enabled: bool,

    /// Capacity of the registration outcome channel
    #[serde(default = "default_outcome_channel_capacity")]
    pub outcome_channel_capacity: usize,

    /// Capacity of the engine event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Wall-clock budget for a single transition dispatch, in milliseconds
    ///
    /// Dispatch is never cut short; overruns are logged.
    #[serde(default = "default_dispatch_budget_ms")]
    pub dispatch_budget_ms: u64,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.outcome_channel_capacity == 0 {
            return Err(crate::Error::config("Outcome channel capacity must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.dispatch_budget_ms == 0 {
            return Err(crate::Error::config("Dispatch budget must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geofencing_enabled: default_geofencing_enabled(),
            outcome_channel_capacity: default_outcome_channel_capacity(),
            event_channel_capacity: default_event_channel_capacity(),
            dispatch_budget_ms: default_dispatch_budget_ms(),
        }
    }
}

fn default_geofencing_enabled() -> bool {
    true
}

fn default_outcome_channel_capacity() -> usize {
    64
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_dispatch_budget_ms() -> u64 {
    1000
}
