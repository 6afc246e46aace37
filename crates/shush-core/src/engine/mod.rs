//! Shush engine
//!
//! The engine is the single "main" execution context of the system. One
//! loop receives connection callbacks, place changes, authorization results
//! and transitions from the host, and registration outcomes from the
//! registry, and handles them one at a time.
//!
//! ## Architecture
//!
//! ```text
//!  PlatformEvent stream ──┐               ┌── RegistrationOutcome channel
//!                         ▼               ▼
//!                      ┌─────────────────────┐
//!                      │     ShushEngine     │──── EngineEvent channel
//!                      └─────────────────────┘
//!                         │               │
//!                         ▼               ▼
//!               ┌──────────────────┐  ┌──────────────────────┐
//!               │ GeofenceRegistry │  │ TransitionDispatcher │
//!               └──────────────────┘  └──────────────────────┘
//!                         │               │
//!                         ▼               ▼
//!                  RegionMonitor     Ringer / Notifier
//! ```
//!
//! ## Event Flow
//!
//! 1. `Connected` / `PlacesChanged`: rebuild the desired set from the place
//!    source, then register it if geofencing is enabled
//! 2. `GeofencingToggled`: register or unregister everything
//! 3. `AuthorizationResult`: on a grant, retry registration
//! 4. `Transition`: decode and dispatch
//! 5. Registration outcomes: log and forward as engine events

use crate::config::ShushConfig;
use crate::dispatcher::{DispatchOutcome, TransitionDispatcher};
use crate::error::Result;
use crate::registry::{
    CallbackTarget, GeofenceRegistry, Operation, RegistrationOutcome, SkipReason, SubmitAck,
};
use crate::traits::{
    AudioPolicy, LocationAuthorization, NotificationPresenter, PlaceSource, RegionMonitor,
    RingerController,
};
use crate::transition::TransitionPayload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Events delivered by the host platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Connection to the monitoring service is up
    Connected,

    /// Connection temporarily lost
    ConnectionSuspended {
        #[serde(default)]
        cause: i32,
    },

    /// Connection attempt failed
    ConnectionFailed {
        #[serde(default)]
        reason: String,
    },

    /// The user's places changed
    PlacesChanged,

    /// The user switched geofencing on or off
    GeofencingToggled { enabled: bool },

    /// Answer to an authorization request
    AuthorizationResult { request_code: u32, granted: bool },

    /// Transition delivered to the callback target
    Transition(TransitionPayload),
}

/// Events emitted by the ShushEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { geofencing_enabled: bool },

    /// Desired set rebuilt from the place source
    PlacesRefreshed { count: usize },

    /// register_all / unregister_all returned
    SubmissionAcknowledged {
        operation: Operation,
        accepted: bool,
        skip_reason: Option<SkipReason>,
        error: Option<String>,
    },

    /// Service answered an add/remove request
    RegistrationCompleted(RegistrationOutcome),

    /// A transition reached the dispatcher
    TransitionDispatched(DispatchOutcome),

    /// A transition payload could not be decoded
    TransitionRejected { reason: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Platform collaborators the engine is wired to
#[derive(Clone)]
pub struct Collaborators {
    pub monitor: Arc<dyn RegionMonitor>,
    pub location: Arc<dyn LocationAuthorization>,
    pub audio_policy: Arc<dyn AudioPolicy>,
    pub ringer: Arc<dyn RingerController>,
    pub notifier: Arc<dyn NotificationPresenter>,
    pub places: Arc<dyn PlaceSource>,
}

/// Core shush engine
///
/// ## Lifecycle
///
/// 1. Create with [`ShushEngine::new()`]
/// 2. Start with [`ShushEngine::run()`]
/// 3. Engine runs until shutdown signal received or the platform stream ends
/// 4. Drop to cleanup
pub struct ShushEngine {
    /// Geofence lifecycle
    registry: GeofenceRegistry,

    /// Outcomes produced by the registry
    outcome_rx: mpsc::Receiver<RegistrationOutcome>,

    /// Transition side effects
    dispatcher: TransitionDispatcher,

    /// Where places come from
    places: Arc<dyn PlaceSource>,

    /// Whether geofences should be registered
    geofencing_enabled: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ShushEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `collaborators`: Platform implementations
    /// - `target`: Callback target every geofence request is made under
    /// - `config`: Shush configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        collaborators: Collaborators,
        target: CallbackTarget,
        config: ShushConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (registry, outcome_rx) = GeofenceRegistry::new(
            collaborators.monitor,
            collaborators.location,
            target,
            config.geofence,
            config.engine.outcome_channel_capacity,
        );

        let dispatcher = TransitionDispatcher::new(
            collaborators.ringer,
            collaborators.notifier,
            collaborators.audio_policy,
            config.notification,
            Duration::from_millis(config.engine.dispatch_budget_ms),
        );

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            registry,
            outcome_rx,
            dispatcher,
            places: collaborators.places,
            geofencing_enabled: config.engine.geofencing_enabled,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The engine's registry
    pub fn registry(&self) -> &GeofenceRegistry {
        &self.registry
    }

    /// Run the engine until Ctrl-C or the end of `events`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error (unrecognized authorization request code)
    pub async fn run<S>(&mut self, events: S) -> Result<()>
    where
        S: Stream<Item = PlatformEvent> + Unpin,
    {
        self.run_internal(events, None).await
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// With `None` this behaves like [`ShushEngine::run`].
    pub async fn run_with_shutdown<S>(
        &mut self,
        events: S,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()>
    where
        S: Stream<Item = PlatformEvent> + Unpin,
    {
        self.run_internal(events, shutdown_rx).await
    }

    async fn run_internal<S>(
        &mut self,
        mut events: S,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()>
    where
        S: Stream<Item = PlatformEvent> + Unpin,
    {
        self.emit_event(EngineEvent::Started {
            geofencing_enabled: self.geofencing_enabled,
        });
        info!(
            "Shush engine started (geofencing {})",
            if self.geofencing_enabled { "enabled" } else { "disabled" }
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                maybe_event = events.next() => {
                    let Some(event) = maybe_event else {
                        info!("Platform event stream ended");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Event stream ended".to_string(),
                        });
                        break;
                    };

                    if let Err(e) = self.handle_platform_event(event).await {
                        if e.is_fatal() {
                            error!("Fatal error, stopping engine: {}", e);
                            self.emit_event(EngineEvent::Stopped {
                                reason: e.to_string(),
                            });
                            return Err(e);
                        }
                        // Continue running despite errors
                        error!("Failed to handle platform event: {}", e);
                    }
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    self.emit_event(EngineEvent::RegistrationCompleted(outcome));
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle one platform event
    async fn handle_platform_event(&mut self, event: PlatformEvent) -> Result<()> {
        match event {
            PlatformEvent::Connected => {
                info!("Region monitoring service connected");
                self.refresh_places().await;
            }
            PlatformEvent::ConnectionSuspended { cause } => {
                info!("Region monitoring connection suspended (cause {})", cause);
            }
            PlatformEvent::ConnectionFailed { reason } => {
                warn!("Region monitoring connection failed: {}", reason);
            }
            PlatformEvent::PlacesChanged => {
                self.refresh_places().await;
            }
            PlatformEvent::GeofencingToggled { enabled } => {
                info!("Geofencing {}", if enabled { "enabled" } else { "disabled" });
                self.geofencing_enabled = enabled;
                if enabled {
                    self.register();
                } else {
                    self.unregister();
                }
            }
            PlatformEvent::AuthorizationResult {
                request_code,
                granted,
            } => {
                let granted = self
                    .registry
                    .on_authorization_result(request_code, granted)?;
                if granted && self.geofencing_enabled {
                    self.register();
                }
            }
            PlatformEvent::Transition(payload) => self.handle_transition(payload),
        }

        Ok(())
    }

    fn handle_transition(&self, payload: TransitionPayload) {
        match payload.into_event() {
            Ok(event) => {
                let outcome = self.dispatcher.on_transition(&event);
                self.emit_event(EngineEvent::TransitionDispatched(outcome));
            }
            Err(e) => {
                warn!("Dropping transition payload: {}", e);
                self.emit_event(EngineEvent::TransitionRejected {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Rebuild the desired set and register it when enabled
    async fn refresh_places(&self) {
        let count = self.registry.refresh_from(self.places.as_ref()).await;
        self.emit_event(EngineEvent::PlacesRefreshed { count });

        if self.geofencing_enabled {
            self.register();
        } else {
            debug!("Geofencing disabled, not registering {} geofence(s)", count);
        }
    }

    fn register(&self) {
        let ack = self.registry.register_all();
        self.acknowledge(Operation::Add, ack);
    }

    fn unregister(&self) {
        let ack = self.registry.unregister_all();
        self.acknowledge(Operation::Remove, ack);
    }

    fn acknowledge(&self, operation: Operation, ack: SubmitAck) {
        self.emit_event(EngineEvent::SubmissionAcknowledged {
            operation,
            accepted: ack.accepted(),
            skip_reason: ack.skip_reason(),
            error: ack.error().map(|e| e.to_string()),
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
