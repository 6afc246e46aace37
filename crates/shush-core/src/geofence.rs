//! Geofence data model and the factory that derives it from places
//!
//! A [`GeofenceDefinition`] is a circular region centred on a [`Place`]. Its
//! id is the place id, which is how a later transition is mapped back to the
//! place the user picked.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use std::time::Duration;

/// Default geofence radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 75.0;

/// Default geofence lifetime (24h) in milliseconds
pub const DEFAULT_EXPIRATION_MS: u64 = 86_400_000;

/// A user-selected place, supplied by a [`PlaceSource`](crate::traits::PlaceSource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Opaque place identifier
    pub id: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Place {
    /// Create a new place record
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
        }
    }
}

/// Bitmask of transition types, as transmitted to the monitoring service
///
/// ENTER=1, EXIT=2, DWELL=4. Deserializing rejects any other bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TriggerMask(u8);

impl TriggerMask {
    pub const NONE: Self = Self(0);
    pub const ENTER: Self = Self(1);
    pub const EXIT: Self = Self(2);
    pub const DWELL: Self = Self(4);
    pub const ALL: Self = Self(0b111);

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from raw bits, keeping only known flags
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Build a mask from raw bits, or `None` if an unknown flag is set
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for TriggerMask {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::from_bits(bits).ok_or_else(|| format!("unknown trigger bits in mask {}", bits))
    }
}

impl From<TriggerMask> for u8 {
    fn from(mask: TriggerMask) -> Self {
        mask.0
    }
}

impl BitOr for TriggerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Fixed policy applied to every geofence the factory builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofencePolicy {
    /// Circle radius in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,

    /// Lifetime of a registered geofence in milliseconds
    #[serde(default = "default_expiration_ms")]
    pub expiration_ms: u64,

    /// Transitions the service should report
    #[serde(default = "default_triggers")]
    pub triggers: TriggerMask,

    /// Transition reported right away when the device is already inside a
    /// fence at registration time
    #[serde(default = "default_initial_trigger")]
    pub initial_trigger: TriggerMask,
}

impl GeofencePolicy {
    /// Lifetime as a duration
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(crate::Error::config(format!(
                "Geofence radius must be a positive number of meters, got {}",
                self.radius_meters
            )));
        }
        if self.expiration_ms == 0 {
            return Err(crate::Error::config("Geofence expiration must be > 0"));
        }
        if self.triggers.is_empty() {
            return Err(crate::Error::config(
                "Geofence trigger mask must include at least one transition",
            ));
        }
        // Only ENTER and EXIT have a side effect
        if !(TriggerMask::ENTER | TriggerMask::EXIT).contains(self.triggers) {
            return Err(crate::Error::config(format!(
                "Geofence trigger mask may only contain ENTER and EXIT, got {}",
                self.triggers.bits()
            )));
        }
        if !TriggerMask::ALL.contains(self.initial_trigger) {
            return Err(crate::Error::config(format!(
                "Initial trigger has unknown bits: {}",
                self.initial_trigger.bits()
            )));
        }
        Ok(())
    }
}

impl Default for GeofencePolicy {
    fn default() -> Self {
        Self {
            radius_meters: default_radius_meters(),
            expiration_ms: default_expiration_ms(),
            triggers: default_triggers(),
            initial_trigger: default_initial_trigger(),
        }
    }
}

fn default_radius_meters() -> f64 {
    DEFAULT_RADIUS_METERS
}

fn default_expiration_ms() -> u64 {
    DEFAULT_EXPIRATION_MS
}

fn default_triggers() -> TriggerMask {
    TriggerMask::ENTER | TriggerMask::EXIT
}

fn default_initial_trigger() -> TriggerMask {
    TriggerMask::ENTER
}

/// A circular region to be monitored
///
/// Immutable once built; only [`GeofenceFactory`] creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceDefinition {
    id: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
    expiration: Duration,
    triggers: TriggerMask,
}

impl GeofenceDefinition {
    /// Correlation key, equal to the originating place id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// (latitude, longitude) of the circle centre
    pub fn center(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn triggers(&self) -> TriggerMask {
        self.triggers
    }

    /// Encode as the tuple the monitoring service expects
    pub fn to_wire(&self) -> WireGeofence {
        WireGeofence {
            id: self.id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius_meters,
            expiration_ms: u64::try_from(self.expiration.as_millis()).unwrap_or(u64::MAX),
            trigger_mask: self.triggers.bits(),
        }
    }
}

/// Wire form of a geofence: (id, center, radius, expiration, triggerMask)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGeofence {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub expiration_ms: u64,
    pub trigger_mask: u8,
}

/// Everything submitted in a single add request
#[derive(Debug, Clone, PartialEq)]
pub struct GeofencingRequest {
    initial_trigger: TriggerMask,
    geofences: Vec<GeofenceDefinition>,
}

impl GeofencingRequest {
    pub fn new(initial_trigger: TriggerMask, geofences: Vec<GeofenceDefinition>) -> Self {
        Self {
            initial_trigger,
            geofences,
        }
    }

    pub fn initial_trigger(&self) -> TriggerMask {
        self.initial_trigger
    }

    pub fn geofences(&self) -> &[GeofenceDefinition] {
        &self.geofences
    }

    pub fn len(&self) -> usize {
        self.geofences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geofences.is_empty()
    }

    /// Wire tuples for every geofence, in request order
    pub fn to_wire(&self) -> Vec<WireGeofence> {
        self.geofences.iter().map(GeofenceDefinition::to_wire).collect()
    }
}

/// Builds geofence definitions from place records
///
/// Pure and deterministic: one definition per place, same order, no
/// deduplication (the registry owns set semantics).
#[derive(Debug, Clone, Default)]
pub struct GeofenceFactory {
    policy: GeofencePolicy,
}

impl GeofenceFactory {
    /// Create a factory applying the given policy
    pub fn new(policy: GeofencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GeofencePolicy {
        &self.policy
    }

    /// Derive one geofence per place
    pub fn build(&self, places: &[Place]) -> Vec<GeofenceDefinition> {
        places.iter().map(|place| self.build_one(place)).collect()
    }

    fn build_one(&self, place: &Place) -> GeofenceDefinition {
        GeofenceDefinition {
            id: place.id.clone(),
            latitude: place.latitude,
            longitude: place.longitude,
            radius_meters: self.policy.radius_meters,
            expiration: self.policy.expiration(),
            triggers: self.policy.triggers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places() -> Vec<Place> {
        vec![
            Place::new("p1", 37.4220, -122.0841),
            Place::new("p2", 51.5007, -0.1246),
            Place::new("p1", 48.8584, 2.2945),
        ]
    }

    #[test]
    fn build_yields_one_definition_per_place_with_fixed_policy() {
        let factory = GeofenceFactory::default();
        let input = places();
        let fences = factory.build(&input);

        assert_eq!(fences.len(), input.len());
        for (fence, place) in fences.iter().zip(&input) {
            assert_eq!(fence.id(), place.id);
            assert_eq!(fence.center(), (place.latitude, place.longitude));
            assert_eq!(fence.radius_meters(), 75.0);
            assert_eq!(fence.expiration(), Duration::from_secs(24 * 60 * 60));
            assert_eq!(fence.triggers(), TriggerMask::ENTER | TriggerMask::EXIT);
        }
    }

    #[test]
    fn build_of_empty_input_is_empty() {
        let factory = GeofenceFactory::default();
        assert!(factory.build(&[]).is_empty());
        assert!(factory.build(&[]).is_empty());
    }

    #[test]
    fn build_keeps_duplicate_ids() {
        let fences = GeofenceFactory::default().build(&places());
        let p1_count = fences.iter().filter(|f| f.id() == "p1").count();
        assert_eq!(p1_count, 2);
    }

    #[test]
    fn build_is_deterministic() {
        let factory = GeofenceFactory::default();
        assert_eq!(factory.build(&places()), factory.build(&places()));
    }

    #[test]
    fn wire_form_uses_bitwise_trigger_mask() {
        let fences = GeofenceFactory::default().build(&[Place::new("home", 1.0, 2.0)]);
        let wire = fences[0].to_wire();

        assert_eq!(wire.id, "home");
        assert_eq!(wire.trigger_mask, 3);
        assert_eq!(wire.expiration_ms, DEFAULT_EXPIRATION_MS);
        assert_eq!(wire.radius_meters, DEFAULT_RADIUS_METERS);
    }

    #[test]
    fn trigger_mask_contains() {
        let mask = TriggerMask::ENTER | TriggerMask::EXIT;
        assert!(mask.contains(TriggerMask::ENTER));
        assert!(mask.contains(TriggerMask::EXIT));
        assert!(!mask.contains(TriggerMask::DWELL));
        assert_eq!(TriggerMask::from_bits_truncate(0xff).bits(), 7);
    }

    #[test]
    fn policy_validation_rejects_bad_values() {
        assert!(GeofencePolicy::default().validate().is_ok());

        let policy = GeofencePolicy {
            radius_meters: 0.0,
            ..GeofencePolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = GeofencePolicy {
            radius_meters: f64::NAN,
            ..GeofencePolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = GeofencePolicy {
            expiration_ms: 0,
            ..GeofencePolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = GeofencePolicy {
            triggers: TriggerMask::NONE,
            ..GeofencePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn policy_validation_rejects_triggers_without_side_effect() {
        let dwell_only = GeofencePolicy {
            triggers: TriggerMask::DWELL,
            ..GeofencePolicy::default()
        };
        assert!(dwell_only.validate().is_err());

        let with_dwell = GeofencePolicy {
            triggers: TriggerMask::ENTER | TriggerMask::EXIT | TriggerMask::DWELL,
            ..GeofencePolicy::default()
        };
        assert!(with_dwell.validate().is_err());

        let enter_only = GeofencePolicy {
            triggers: TriggerMask::ENTER,
            ..GeofencePolicy::default()
        };
        assert!(enter_only.validate().is_ok());
    }

    #[test]
    fn policy_validation_rejects_unknown_initial_trigger_bits() {
        let policy = GeofencePolicy {
            initial_trigger: TriggerMask(8),
            ..GeofencePolicy::default()
        };
        assert!(policy.validate().is_err());

        let none = GeofencePolicy {
            initial_trigger: TriggerMask::NONE,
            ..GeofencePolicy::default()
        };
        assert!(none.validate().is_ok());
    }

    #[test]
    fn dwell_only_policy_deserializes_but_fails_validation() {
        let policy: GeofencePolicy = serde_json::from_str(r#"{"triggers": 4}"#).unwrap();
        assert_eq!(policy.triggers, TriggerMask::DWELL);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn unknown_trigger_bits_are_rejected_when_deserializing() {
        assert!(serde_json::from_str::<GeofencePolicy>(r#"{"triggers": 200}"#).is_err());
        assert!(serde_json::from_str::<GeofencePolicy>(r#"{"initial_trigger": 16}"#).is_err());
        assert!(serde_json::from_str::<TriggerMask>("3").is_ok());
        assert_eq!(serde_json::to_string(&TriggerMask::EXIT).unwrap(), "2");
        assert_eq!(TriggerMask::from_bits(9), None);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: GeofencePolicy = serde_json::from_str(r#"{"radius_meters": 120.0}"#).unwrap();
        assert_eq!(policy.radius_meters, 120.0);
        assert_eq!(policy.expiration_ms, DEFAULT_EXPIRATION_MS);
        assert_eq!(policy.triggers.bits(), 3);
        assert_eq!(policy.initial_trigger, TriggerMask::ENTER);
    }
}
