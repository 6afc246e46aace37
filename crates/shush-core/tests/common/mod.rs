//! Test doubles and common utilities for contract tests
//!
//! Call-counting stand-ins for every platform collaborator. Ringer and
//! notifier calls go to one shared log so tests can assert their order.

#![allow(dead_code)]

use shush_core::error::{Error, Result};
use shush_core::geofence::{GeofencePolicy, GeofencingRequest, Place};
use shush_core::registry::{CallbackTarget, GeofenceRegistry, RegistrationOutcome};
use shush_core::traits::{
    LocationAuthorization, Notification, NotificationPresenter, PendingStatus, RegionMonitor,
    RingerController, RingerMode,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A region monitor that records calls and answers as configured
pub struct MockRegionMonitor {
    connected: AtomicBool,
    add_call_count: AtomicUsize,
    remove_call_count: AtomicUsize,
    targets: Mutex<Vec<CallbackTarget>>,
    requests: Mutex<Vec<GeofencingRequest>>,
    /// Service answer detail for failed requests; `None` answers success
    rejection: Mutex<Option<String>>,
    /// Fail submission with a security error
    security_failure: AtomicBool,
    /// Gate holding back the next answer
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockRegionMonitor {
    pub fn connected() -> Self {
        Self::with_connection(true)
    }

    pub fn disconnected() -> Self {
        Self::with_connection(false)
    }

    fn with_connection(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            add_call_count: AtomicUsize::new(0),
            remove_call_count: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            rejection: Mutex::new(None),
            security_failure: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Answer every following request with a rejection
    pub fn reject_with(&self, detail: &str) {
        *self.rejection.lock().unwrap() = Some(detail.to_string());
    }

    /// Fail every following submission with a security error
    pub fn fail_with_security_error(&self) {
        self.security_failure.store(true, Ordering::SeqCst);
    }

    /// Hold the next answer until the returned sender fires
    pub fn hold_next_answer(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn add_call_count(&self) -> usize {
        self.add_call_count.load(Ordering::SeqCst)
    }

    pub fn remove_call_count(&self) -> usize {
        self.remove_call_count.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<CallbackTarget> {
        self.targets.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<GeofencingRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, operation: &str) -> Result<PendingStatus> {
        if self.security_failure.load(Ordering::SeqCst) {
            return Err(Error::security("ACCESS_FINE_LOCATION revoked"));
        }

        let rejection = self.rejection.lock().unwrap().clone();
        let gate = self.gate.lock().unwrap().take();
        let operation = operation.to_string();

        Ok(Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match rejection {
                Some(detail) => Err(Error::rejected(operation, detail)),
                None => Ok(()),
            }
        }))
    }
}

impl RegionMonitor for MockRegionMonitor {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn add_regions(
        &self,
        target: &CallbackTarget,
        request: &GeofencingRequest,
    ) -> Result<PendingStatus> {
        self.add_call_count.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        self.requests.lock().unwrap().push(request.clone());
        self.answer("add")
    }

    fn remove_regions(&self, target: &CallbackTarget) -> Result<PendingStatus> {
        self.remove_call_count.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        self.answer("remove")
    }

    fn service_name(&self) -> &'static str {
        "mock"
    }
}

/// Location authorization that records requests
pub struct MockLocationAuthorization {
    granted: AtomicBool,
    requested_codes: Mutex<Vec<u32>>,
}

impl MockLocationAuthorization {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
            requested_codes: Mutex::new(Vec::new()),
        }
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn requested_codes(&self) -> Vec<u32> {
        self.requested_codes.lock().unwrap().clone()
    }
}

impl LocationAuthorization for MockLocationAuthorization {
    fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request(&self, request_code: u32) {
        self.requested_codes.lock().unwrap().push(request_code);
    }
}

/// One recorded side effect
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Ringer(RingerMode),
    Notification(Notification),
}

pub type SideEffectLog = Arc<Mutex<Vec<SideEffect>>>;

pub fn side_effect_log() -> SideEffectLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Ringer that records into the shared log, or refuses
pub struct RecordingRinger {
    log: SideEffectLog,
    refuse: bool,
}

impl RecordingRinger {
    pub fn new(log: SideEffectLog) -> Self {
        Self { log, refuse: false }
    }

    /// A ringer whose every call fails with `AuthorizationMissing`
    pub fn refusing(log: SideEffectLog) -> Self {
        Self { log, refuse: true }
    }
}

impl RingerController for RecordingRinger {
    fn set_mode(&self, mode: RingerMode) -> Result<()> {
        if self.refuse {
            return Err(Error::authorization("notification policy access not granted"));
        }
        self.log.lock().unwrap().push(SideEffect::Ringer(mode));
        Ok(())
    }
}

/// Notifier that records into the shared log
pub struct RecordingNotifier {
    log: SideEffectLog,
}

impl RecordingNotifier {
    pub fn new(log: SideEffectLog) -> Self {
        Self { log }
    }
}

impl NotificationPresenter for RecordingNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(SideEffect::Notification(notification.clone()));
        Ok(())
    }
}

pub fn ringer_calls(log: &SideEffectLog) -> Vec<RingerMode> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|effect| match effect {
            SideEffect::Ringer(mode) => Some(*mode),
            _ => None,
        })
        .collect()
}

pub fn notifications(log: &SideEffectLog) -> Vec<Notification> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|effect| match effect {
            SideEffect::Notification(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

/// Build a registry over the given doubles
pub fn registry_with(
    monitor: &Arc<MockRegionMonitor>,
    authorization: &Arc<MockLocationAuthorization>,
) -> (GeofenceRegistry, mpsc::Receiver<RegistrationOutcome>) {
    registry_with_capacity(monitor, authorization, 16)
}

/// Build a registry whose outcome channel holds `capacity` outcomes
pub fn registry_with_capacity(
    monitor: &Arc<MockRegionMonitor>,
    authorization: &Arc<MockLocationAuthorization>,
    capacity: usize,
) -> (GeofenceRegistry, mpsc::Receiver<RegistrationOutcome>) {
    GeofenceRegistry::new(
        monitor.clone(),
        authorization.clone(),
        CallbackTarget::new("test.geofence-transitions"),
        GeofencePolicy::default(),
        capacity,
    )
}

pub fn sample_places() -> Vec<Place> {
    vec![
        Place::new("p1", 37.4220, -122.0841),
        Place::new("p2", 40.7580, -73.9855),
    ]
}

/// Wait for the next outcome, failing the test after a second
pub async fn next_outcome(rx: &mut mpsc::Receiver<RegistrationOutcome>) -> RegistrationOutcome {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("outcome arrives within a second")
        .expect("outcome channel open")
}
