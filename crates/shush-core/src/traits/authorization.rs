// # Authorization Traits
//
// Two capabilities gate the core's side effects:
// - Location access, required before geofences are submitted. When missing
//   the registry asks for it and the grant comes back out-of-band.
// - Audio-policy access, required before the ringer mode is changed. When
//   missing the dispatcher skips the mode change and still notifies.
//
// Platform-version checks belong inside the implementations, so the
// dispatcher only ever asks one question.

use std::sync::atomic::{AtomicBool, Ordering};

/// Location-access authorization
pub trait LocationAuthorization: Send + Sync {
    /// Whether fine location access is currently held
    fn is_granted(&self) -> bool;

    /// Ask the user for location access
    ///
    /// Fire-and-forget: the answer is delivered later with `request_code`.
    fn request(&self, request_code: u32);
}

/// Capability query for changing the system-wide ringer mode
pub trait AudioPolicy: Send + Sync {
    /// Whether this process may change the ringer mode right now
    fn can_change_ringer_mode(&self) -> bool;
}

/// Audio policy answer held in a flag
///
/// Covers platforms without an audio-policy permission (always `true`) and
/// hosts that push grant changes in from the outside.
#[derive(Debug)]
pub struct StaticAudioPolicy {
    granted: AtomicBool,
}

impl StaticAudioPolicy {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
        }
    }

    /// Policy for platforms where no permission is involved
    pub fn unrestricted() -> Self {
        Self::new(true)
    }

    /// Record a grant or revocation
    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }
}

impl AudioPolicy for StaticAudioPolicy {
    fn can_change_ringer_mode(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_policy_follows_grants() {
        let policy = StaticAudioPolicy::new(false);
        assert!(!policy.can_change_ringer_mode());

        policy.set_granted(true);
        assert!(policy.can_change_ringer_mode());

        assert!(StaticAudioPolicy::unrestricted().can_change_ringer_mode());
    }
}
