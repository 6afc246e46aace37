// # Region Monitor Trait
//
// Defines the interface to the external location service that watches
// geofences and reports transitions.
//
// ## Submission vs. completion
//
// Both operations have two failure points, mirroring how location services
// behave:
// - Submission may fail right away (typically a security error when location
//   access was revoked). That is the outer `Result`.
// - The service answers later. That is the returned [`PendingStatus`], which
//   the registry awaits on a separate task.
//
// ## Usage
//
// ```rust,ignore
// use shush_core::traits::RegionMonitor;
//
// let pending = monitor.add_regions(&target, &request)?;
// tokio::spawn(async move {
//     if let Err(e) = pending.await {
//         tracing::error!("add failed: {}", e);
//     }
// });
// ```

use crate::geofence::GeofencingRequest;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Eventual status of an add/remove request
pub type PendingStatus = Pin<Box<dyn Future<Output = Result<(), crate::Error>> + Send + 'static>>;

/// Routing handle the service uses to deliver transitions back to this process
///
/// The service correlates add and remove requests by target identity, so a
/// registry holds exactly one target for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackTarget {
    name: String,
}

impl CallbackTarget {
    /// Create a target with the given routing name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for CallbackTarget {
    fn default() -> Self {
        Self::new("shush.geofence-transitions")
    }
}

impl fmt::Display for CallbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Trait for region monitoring service implementations
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
///
/// # Non-blocking
///
/// `add_regions` and `remove_regions` must return without waiting for the
/// service to answer. Retries are not the implementation's business: a
/// rejected request is reported once through the pending status.
pub trait RegionMonitor: Send + Sync {
    /// Whether the connection to the service is currently up
    fn is_connected(&self) -> bool;

    /// Submit geofences for monitoring under `target`
    ///
    /// # Returns
    ///
    /// - `Ok(PendingStatus)`: Request submitted; await for the service answer
    /// - `Err(Error::Security)`: Submission refused before reaching the service
    fn add_regions(
        &self,
        target: &CallbackTarget,
        request: &GeofencingRequest,
    ) -> Result<PendingStatus, crate::Error>;

    /// Remove every geofence registered under `target`
    ///
    /// Removing when nothing is registered is not an error.
    fn remove_regions(&self, target: &CallbackTarget) -> Result<PendingStatus, crate::Error>;

    /// Service name (for logging)
    fn service_name(&self) -> &'static str {
        "region-monitor"
    }
}
