//! Simulated platform collaborators
//!
//! Stand-ins for the location service, permission prompts, ringer and
//! notification shade. They log what a real platform would do so the engine
//! can be driven end to end from a terminal.

use shush_core::geofence::GeofencingRequest;
use shush_core::traits::{
    CallbackTarget, LocationAuthorization, Notification, NotificationPresenter, PendingStatus,
    RegionMonitor, RingerController, RingerMode,
};
use shush_core::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Region monitor that accepts every request and logs the wire tuples
pub struct LoggingRegionMonitor {
    connected: Arc<AtomicBool>,
}

impl LoggingRegionMonitor {
    pub fn new(connected: Arc<AtomicBool>) -> Self {
        Self { connected }
    }
}

impl RegionMonitor for LoggingRegionMonitor {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn add_regions(
        &self,
        target: &CallbackTarget,
        request: &GeofencingRequest,
    ) -> Result<PendingStatus> {
        for wire in request.to_wire() {
            info!(
                "add[{}] {}",
                target,
                serde_json::to_string(&wire).unwrap_or_else(|e| e.to_string())
            );
        }
        Ok(Box::pin(async { Ok::<(), shush_core::Error>(()) }))
    }

    fn remove_regions(&self, target: &CallbackTarget) -> Result<PendingStatus> {
        info!("remove[{}] all geofences", target);
        Ok(Box::pin(async { Ok::<(), shush_core::Error>(()) }))
    }

    fn service_name(&self) -> &'static str {
        "simulated-location-service"
    }
}

/// Location authorization driven by a flag
pub struct FlagLocationAuthorization {
    granted: Arc<AtomicBool>,
}

impl FlagLocationAuthorization {
    pub fn new(granted: Arc<AtomicBool>) -> Self {
        Self { granted }
    }
}

impl LocationAuthorization for FlagLocationAuthorization {
    fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request(&self, request_code: u32) {
        warn!(
            "Location access requested (code {}); answer with an authorization_result event",
            request_code
        );
    }
}

pub struct LoggingRinger;

impl RingerController for LoggingRinger {
    fn set_mode(&self, mode: RingerMode) -> Result<()> {
        info!("Ringer mode -> {}", mode);
        Ok(())
    }
}

pub struct LoggingNotifier;

impl NotificationPresenter for LoggingNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            "Notification #{} [{:?}] {}: {}",
            notification.id, notification.icon, notification.title, notification.body
        );
        Ok(())
    }
}
