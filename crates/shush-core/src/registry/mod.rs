//! Geofence registry
//!
//! The registry owns the desired geofence set and the single
//! [`CallbackTarget`] every add/remove request is made under, and submits
//! the set to a [`RegionMonitor`].
//!
//! ## Non-blocking submission
//!
//! `register_all` and `unregister_all` return a [`SubmitAck`] immediately.
//! The service answer is awaited on a spawned task and delivered as a
//! [`RegistrationOutcome`] on the channel handed out by
//! [`GeofenceRegistry::new`]. Failed outcomes are logged and reported, never
//! retried.
//!
//! ## Preconditions (register)
//!
//! Checked in order:
//! 1. Service connected, else skipped silently
//! 2. Desired set non-empty, else skipped silently
//! 3. Location access held, else access is requested and the call is skipped;
//!    the host retries after a grant
//!
//! ## State machine
//!
//! ```text
//! Unconnected ──(service connects)──▶ Connected
//!     Connected ──register_all──▶ Registering ──outcome──▶ Registered
//!     Connected ──unregister_all──▶ Unregistering ──outcome──▶ Unregistered
//! ```
//!
//! A failed outcome falls back to `Connected`.

use crate::error::{Error, Result};
use crate::geofence::{GeofenceDefinition, GeofenceFactory, GeofencePolicy, GeofencingRequest, Place};
use crate::traits::{LocationAuthorization, PendingStatus, PlaceSource, RegionMonitor};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub use crate::traits::CallbackTarget;

/// Request code attached to location authorization requests
pub const LOCATION_REQUEST_CODE: u32 = 117;

/// Which request an outcome answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Remove => f.write_str("remove"),
        }
    }
}

/// Service answer to an add/remove request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub operation: Operation,
    pub success: bool,
    pub error_detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RegistrationOutcome {
    fn from_status(operation: Operation, status: Result<()>) -> Self {
        Self {
            operation,
            success: status.is_ok(),
            error_detail: status.err().map(|e| e.to_string()),
            completed_at: Utc::now(),
        }
    }
}

/// Why a submission was not made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Service connection not up yet
    NotConnected,
    /// Nothing to register
    EmptyDesiredSet,
    /// Location access was missing and has been requested
    AuthorizationRequested,
}

/// Immediate result of `register_all` / `unregister_all`
#[derive(Debug)]
pub enum SubmitAck {
    /// Submitted; the outcome arrives on the outcome channel
    Accepted,
    /// Not submitted, not an error
    Skipped(SkipReason),
    /// Submission failed before reaching the service
    Failed(Error),
}

impl SubmitAck {
    pub fn accepted(&self) -> bool {
        matches!(self, SubmitAck::Accepted)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            SubmitAck::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            SubmitAck::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Registry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Unconnected,
    Connected,
    Registering,
    Registered,
    Unregistering,
    Unregistered,
}

#[derive(Debug)]
struct Shared {
    desired: Vec<GeofenceDefinition>,
    state: RegistryState,
}

/// Keeps the registered geofence set consistent with the desired set
///
/// ## Threading
///
/// The desired set is guarded by a mutex; `set_desired_geofences` is the
/// only writer. The lock is never held across an await.
pub struct GeofenceRegistry {
    /// Location service
    monitor: Arc<dyn RegionMonitor>,

    /// Location access check/request
    authorization: Arc<dyn LocationAuthorization>,

    /// Routing handle shared by every add and remove request
    target: CallbackTarget,

    /// Builds definitions from places
    factory: GeofenceFactory,

    /// Desired set and lifecycle state
    shared: Arc<Mutex<Shared>>,

    /// Outcome delivery
    outcome_tx: mpsc::Sender<RegistrationOutcome>,
}

impl GeofenceRegistry {
    /// Create a new registry
    ///
    /// # Parameters
    ///
    /// - `monitor`: Region monitoring service
    /// - `authorization`: Location authorization
    /// - `target`: Callback target used for every request, for the
    ///   registry's whole lifetime
    /// - `policy`: Geofence policy for the factory
    /// - `outcome_capacity`: Capacity of the outcome channel
    ///
    /// # Returns
    ///
    /// A tuple of (registry, outcome_receiver)
    pub fn new(
        monitor: Arc<dyn RegionMonitor>,
        authorization: Arc<dyn LocationAuthorization>,
        target: CallbackTarget,
        policy: GeofencePolicy,
        outcome_capacity: usize,
    ) -> (Self, mpsc::Receiver<RegistrationOutcome>) {
        let (tx, rx) = mpsc::channel(outcome_capacity.max(1));

        let registry = Self {
            monitor,
            authorization,
            target,
            factory: GeofenceFactory::new(policy),
            shared: Arc::new(Mutex::new(Shared {
                desired: Vec::new(),
                state: RegistryState::Unconnected,
            })),
            outcome_tx: tx,
        };

        (registry, rx)
    }

    /// The callback target; identical on every call
    pub fn callback_target(&self) -> &CallbackTarget {
        &self.target
    }

    /// Replace the desired set with geofences built from `places`
    ///
    /// The previous set is discarded wholesale. Duplicate ids keep their
    /// first occurrence. Does not contact the service.
    ///
    /// # Returns
    ///
    /// The size of the new desired set
    pub fn set_desired_geofences(&self, places: &[Place]) -> usize {
        let mut seen = HashSet::new();
        let mut desired = Vec::with_capacity(places.len());

        for fence in self.factory.build(places) {
            if seen.insert(fence.id().to_string()) {
                desired.push(fence);
            } else {
                warn!("Dropping duplicate geofence id {}", fence.id());
            }
        }

        let count = desired.len();
        lock(&self.shared).desired = desired;
        debug!("Desired geofence set replaced: {} geofence(s)", count);
        count
    }

    /// Rebuild the desired set from a place source
    ///
    /// A failing source degrades to an empty set.
    pub async fn refresh_from(&self, source: &dyn PlaceSource) -> usize {
        match source.places().await {
            Ok(places) => self.set_desired_geofences(&places),
            Err(e) => {
                warn!(
                    "Place source {} failed, clearing desired geofences: {}",
                    source.source_name(),
                    e
                );
                self.set_desired_geofences(&[])
            }
        }
    }

    /// Snapshot of the desired set
    pub fn desired_geofences(&self) -> Vec<GeofenceDefinition> {
        lock(&self.shared).desired.clone()
    }

    /// Current lifecycle state
    ///
    /// A disconnected service always reads as `Unconnected`, whatever was
    /// last submitted.
    pub fn state(&self) -> RegistryState {
        if !self.monitor.is_connected() {
            return RegistryState::Unconnected;
        }
        match lock(&self.shared).state {
            RegistryState::Unconnected => RegistryState::Connected,
            other => other,
        }
    }

    /// Submit the whole desired set for monitoring
    pub fn register_all(&self) -> SubmitAck {
        if !self.monitor.is_connected() {
            debug!("{} not connected, skipping registration", self.monitor.service_name());
            return SubmitAck::Skipped(SkipReason::NotConnected);
        }

        let request = {
            let shared = lock(&self.shared);
            if shared.desired.is_empty() {
                debug!("No geofences to register");
                return SubmitAck::Skipped(SkipReason::EmptyDesiredSet);
            }
            GeofencingRequest::new(self.factory.policy().initial_trigger, shared.desired.clone())
        };

        if !self.authorization.is_granted() {
            info!("Location access missing, requesting it before registering geofences");
            self.authorization.request(LOCATION_REQUEST_CODE);
            return SubmitAck::Skipped(SkipReason::AuthorizationRequested);
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return SubmitAck::Failed(Error::Other(format!("No async runtime: {}", e))),
        };

        match self.monitor.add_regions(&self.target, &request) {
            Ok(pending) => {
                info!(
                    "Submitted {} geofence(s) to {} under {}",
                    request.len(),
                    self.monitor.service_name(),
                    self.target
                );
                self.track(handle, Operation::Add, pending);
                SubmitAck::Accepted
            }
            Err(e) => {
                error!("Failed to submit geofences: {}", e);
                SubmitAck::Failed(e)
            }
        }
    }

    /// Remove every geofence registered under the callback target
    ///
    /// Does not look at the desired set, and succeeds when nothing is
    /// registered.
    pub fn unregister_all(&self) -> SubmitAck {
        if !self.monitor.is_connected() {
            debug!("{} not connected, skipping unregistration", self.monitor.service_name());
            return SubmitAck::Skipped(SkipReason::NotConnected);
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return SubmitAck::Failed(Error::Other(format!("No async runtime: {}", e))),
        };

        match self.monitor.remove_regions(&self.target) {
            Ok(pending) => {
                info!("Requested removal of geofences under {}", self.target);
                self.track(handle, Operation::Remove, pending);
                SubmitAck::Accepted
            }
            Err(e) => {
                error!("Failed to remove geofences: {}", e);
                SubmitAck::Failed(e)
            }
        }
    }

    /// Handle the answer to a location authorization request
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Access granted; call `register_all` again
    /// - `Ok(false)`: Access denied
    /// - `Err(Error::UnrecognizedRequestCode)`: Not a request this registry made
    pub fn on_authorization_result(&self, request_code: u32, granted: bool) -> Result<bool> {
        if request_code != LOCATION_REQUEST_CODE {
            return Err(Error::UnrecognizedRequestCode(request_code));
        }

        if granted {
            info!("Location access granted");
        } else {
            warn!("Location access denied, geofences stay unregistered");
        }
        Ok(granted)
    }

    /// Await `pending` off the caller's path and publish its outcome
    fn track(&self, handle: tokio::runtime::Handle, operation: Operation, pending: PendingStatus) {
        lock(&self.shared).state = match operation {
            Operation::Add => RegistryState::Registering,
            Operation::Remove => RegistryState::Unregistering,
        };

        let shared = Arc::clone(&self.shared);
        let outcome_tx = self.outcome_tx.clone();

        handle.spawn(async move {
            let outcome = RegistrationOutcome::from_status(operation, pending.await);

            lock(&shared).state = match (operation, outcome.success) {
                (Operation::Add, true) => RegistryState::Registered,
                (Operation::Remove, true) => RegistryState::Unregistered,
                (_, false) => RegistryState::Connected,
            };

            match &outcome.error_detail {
                None => info!("Geofence {} completed", operation),
                Some(detail) => error!("There was an error during geofence {}: {}", operation, detail),
            }

            // Waits for room; only a closed receiver loses the outcome
            if outcome_tx.send(outcome).await.is_err() {
                warn!("Outcome receiver closed, dropping {} outcome", operation);
            }
        });
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct OfflineMonitor;

    impl RegionMonitor for OfflineMonitor {
        fn is_connected(&self) -> bool {
            false
        }

        fn add_regions(&self, _: &CallbackTarget, _: &GeofencingRequest) -> Result<PendingStatus> {
            Err(Error::Other("must not be called".to_string()))
        }

        fn remove_regions(&self, _: &CallbackTarget) -> Result<PendingStatus> {
            Err(Error::Other("must not be called".to_string()))
        }
    }

    struct Granted(AtomicBool);

    impl LocationAuthorization for Granted {
        fn is_granted(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn request(&self, _request_code: u32) {}
    }

    fn registry() -> GeofenceRegistry {
        let (registry, _rx) = GeofenceRegistry::new(
            Arc::new(OfflineMonitor),
            Arc::new(Granted(AtomicBool::new(true))),
            CallbackTarget::new("test-target"),
            GeofencePolicy::default(),
            8,
        );
        registry
    }

    #[test]
    fn callback_target_is_stable() {
        let registry = registry();
        let first = registry.callback_target().clone();
        let second = registry.callback_target().clone();
        assert_eq!(first, second);
        assert_eq!(first.name(), "test-target");
    }

    #[test]
    fn desired_set_is_replaced_and_deduplicated() {
        let registry = registry();

        let count = registry.set_desired_geofences(&[
            Place::new("a", 1.0, 1.0),
            Place::new("b", 2.0, 2.0),
            Place::new("a", 3.0, 3.0),
        ]);
        assert_eq!(count, 2);
        let desired = registry.desired_geofences();
        assert_eq!(desired[0].id(), "a");
        assert_eq!(desired[0].center(), (1.0, 1.0));

        registry.set_desired_geofences(&[Place::new("c", 0.0, 0.0)]);
        let ids: Vec<_> = registry
            .desired_geofences()
            .iter()
            .map(|g| g.id().to_string())
            .collect();
        assert_eq!(ids, vec!["c".to_string()]);
    }

    #[test]
    fn offline_registry_is_unconnected_and_skips() {
        let registry = registry();
        registry.set_desired_geofences(&[Place::new("a", 1.0, 1.0)]);

        assert_eq!(registry.state(), RegistryState::Unconnected);
        let ack = registry.register_all();
        assert!(!ack.accepted());
        assert!(ack.error().is_none());
        assert_eq!(ack.skip_reason(), Some(SkipReason::NotConnected));
        assert_eq!(registry.unregister_all().skip_reason(), Some(SkipReason::NotConnected));
    }

    #[test]
    fn authorization_result_for_foreign_code_is_fatal() {
        let registry = registry();
        assert!(registry.on_authorization_result(LOCATION_REQUEST_CODE, true).unwrap());
        assert!(!registry.on_authorization_result(LOCATION_REQUEST_CODE, false).unwrap());

        let err = registry.on_authorization_result(0, true).unwrap_err();
        assert!(err.is_fatal());
    }
}
