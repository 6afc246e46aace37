//! Transition events delivered by the monitoring service
//!
//! The service reports a raw integer transition type (ENTER=1, EXIT=2,
//! DWELL=4) plus the ids of the matched regions. Anything other than ENTER
//! or EXIT is kept as [`TransitionKind::Unknown`] so the dispatcher can log
//! and ignore it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Raw ENTER code
pub const TRANSITION_ENTER: i32 = 1;
/// Raw EXIT code
pub const TRANSITION_EXIT: i32 = 2;
/// Raw DWELL code, not acted on
pub const TRANSITION_DWELL: i32 = 4;

/// Kind of boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Enter,
    Exit,
    /// Any other code, DWELL included
    Unknown(i32),
}

impl TransitionKind {
    /// Map a raw service code to a kind
    pub fn from_code(code: i32) -> Self {
        match code {
            TRANSITION_ENTER => Self::Enter,
            TRANSITION_EXIT => Self::Exit,
            other => Self::Unknown(other),
        }
    }

    /// Raw service code
    pub fn code(self) -> i32 {
        match self {
            Self::Enter => TRANSITION_ENTER,
            Self::Exit => TRANSITION_EXIT,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("ENTER"),
            Self::Exit => f.write_str("EXIT"),
            Self::Unknown(TRANSITION_DWELL) => f.write_str("DWELL"),
            Self::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// A decoded transition, consumed once by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub region_ids: BTreeSet<String>,
}

impl TransitionEvent {
    pub fn new<I, S>(kind: TransitionKind, region_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            region_ids: region_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Payload as delivered to the callback target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    /// Raw transition type
    pub transition: i32,

    /// Ids of the geofences that triggered
    #[serde(default)]
    pub region_ids: Vec<String>,

    /// Set when the service reports a monitoring error instead of a transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
}

impl TransitionPayload {
    /// Parse a JSON payload
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Decode into a transition event
    ///
    /// Fails when the payload carries a service error code.
    pub fn into_event(self) -> crate::Result<TransitionEvent> {
        if let Some(code) = self.error_code {
            return Err(crate::Error::MonitoringError(code));
        }

        Ok(TransitionEvent::new(
            TransitionKind::from_code(self.transition),
            self.region_ids,
        ))
    }
}
