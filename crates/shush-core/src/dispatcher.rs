//! Transition dispatcher
//!
//! Maps a [`TransitionEvent`] to its side effects:
//!
//! | kind    | ringer             | notification                 |
//! |---------|--------------------|------------------------------|
//! | ENTER   | `Silent`           | "Entering geofence", muted   |
//! | EXIT    | `Normal`           | "Exiting geofence", unmuted  |
//! | other   | none               | none                         |
//!
//! The ringer change always happens before the notification is posted. If
//! the audio policy forbids the change, or the controller refuses it, the
//! notification is still posted: it describes the intended mode.
//!
//! Dispatch runs inside a host callback with a hard wall-clock limit, so it
//! only performs the two local calls. Anything slower belongs on a spawned
//! task.

use crate::config::NotificationConfig;
use crate::error::Error;
use crate::traits::{
    AudioPolicy, Notification, NotificationIcon, NotificationPresenter, RingerController,
    RingerMode,
};
use crate::transition::{TransitionEvent, TransitionKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What a dispatch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// ENTER or EXIT handled
    Applied {
        /// Intended ringer mode
        mode: RingerMode,
        /// Whether the ringer mode was actually changed
        ringer_changed: bool,
        /// Whether the notification was posted
        notified: bool,
    },
    /// Transition kind not acted on
    Ignored { code: i32 },
}

/// Dispatches transitions to the ringer controller and notification presenter
pub struct TransitionDispatcher {
    ringer: Arc<dyn RingerController>,
    notifier: Arc<dyn NotificationPresenter>,
    audio_policy: Arc<dyn AudioPolicy>,
    notification: NotificationConfig,
    budget: Duration,
}

impl TransitionDispatcher {
    /// Create a new dispatcher
    ///
    /// # Parameters
    ///
    /// - `ringer`: Ringer mode controller
    /// - `notifier`: Notification presenter
    /// - `audio_policy`: Capability check consulted before every mode change
    /// - `notification`: Notification text and slot
    /// - `budget`: Wall-clock budget per dispatch; overruns are logged
    pub fn new(
        ringer: Arc<dyn RingerController>,
        notifier: Arc<dyn NotificationPresenter>,
        audio_policy: Arc<dyn AudioPolicy>,
        notification: NotificationConfig,
        budget: Duration,
    ) -> Self {
        Self {
            ringer,
            notifier,
            audio_policy,
            notification,
            budget,
        }
    }

    /// Dispatch a single transition
    ///
    /// Never fails: every error is logged and reflected in the outcome.
    pub fn on_transition(&self, event: &TransitionEvent) -> DispatchOutcome {
        let started = Instant::now();

        let (mode, body, icon) = match event.kind {
            TransitionKind::Enter => (
                RingerMode::Silent,
                &self.notification.entering_text,
                NotificationIcon::Muted,
            ),
            TransitionKind::Exit => (
                RingerMode::Normal,
                &self.notification.exiting_text,
                NotificationIcon::Unmuted,
            ),
            TransitionKind::Unknown(code) => {
                let err = Error::UnknownTransition(code);
                warn!("{} ({}, regions: {:?})", err, event.kind, event.region_ids);
                return DispatchOutcome::Ignored { code };
            }
        };

        info!("Geofence {} for {:?}", event.kind, event.region_ids);

        let ringer_changed = self.apply_ringer_mode(mode);

        let notification = Notification {
            id: self.notification.notification_id,
            title: self.notification.title.clone(),
            body: body.clone(),
            icon,
        };
        let notified = match self.notifier.show(&notification) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to post transition notification: {}", e);
                false
            }
        };

        let elapsed = started.elapsed();
        if elapsed > self.budget {
            warn!(
                "Transition dispatch took {:?}, over the {:?} budget",
                elapsed, self.budget
            );
        }

        DispatchOutcome::Applied {
            mode,
            ringer_changed,
            notified,
        }
    }

    fn apply_ringer_mode(&self, mode: RingerMode) -> bool {
        if !self.audio_policy.can_change_ringer_mode() {
            let err = Error::authorization("audio policy access not granted");
            debug!("{}, leaving ringer mode unchanged", err);
            return false;
        }

        match self.ringer.set_mode(mode) {
            Ok(()) => {
                debug!("Ringer mode set to {}", mode);
                true
            }
            Err(e) => {
                warn!("Ringer mode change to {} skipped: {}", mode, e);
                false
            }
        }
    }
}
