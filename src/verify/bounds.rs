use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Monitored quantities
// ---------------------------------------------------------------------------

/// Fixed vocabulary of quantities the verifier knows how to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Altitude,          // ft
    LoadFactor,        // g
    Airspeed,          // ft/s
    AngleOfAttack,     // deg
    SideslipMagnitude, // deg, |beta|
    RollAcceleration,  // deg/s^2, |d(ps)/dt|
    ControlSaturation, // fraction of surface travel, needs actuator limits
}

impl Quantity {
    pub const ALL: [Quantity; 7] = [
        Quantity::Altitude,
        Quantity::LoadFactor,
        Quantity::Airspeed,
        Quantity::AngleOfAttack,
        Quantity::SideslipMagnitude,
        Quantity::RollAcceleration,
        Quantity::ControlSaturation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Altitude => "altitude",
            Self::LoadFactor => "load_factor",
            Self::Airspeed => "airspeed",
            Self::AngleOfAttack => "angle_of_attack",
            Self::SideslipMagnitude => "sideslip_magnitude",
            Self::RollAcceleration => "roll_acceleration",
            Self::ControlSaturation => "control_saturation",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Altitude => "ft",
            Self::LoadFactor => "g",
            Self::Airspeed => "ft/s",
            Self::AngleOfAttack | Self::SideslipMagnitude => "deg",
            Self::RollAcceleration => "deg/s^2",
            Self::ControlSaturation => "",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quantity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.label() == s)
            .ok_or_else(|| ConfigError::invalid("quantity", format!("unknown quantity '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Which side of a bound an observation fell on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundEdge {
    Lower(f64),
    Upper(f64),
    /// The observation itself was NaN.
    Undefined,
}

/// Closed interval `[lower, upper]`. Only built through [`SafetyBounds`],
/// which guarantees `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "(f64, f64)")]
pub struct Bound {
    lower: f64,
    upper: f64,
}

impl Bound {
    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn check(&self, value: f64) -> Option<BoundEdge> {
        if value.is_nan() {
            Some(BoundEdge::Undefined)
        } else if value < self.lower {
            Some(BoundEdge::Lower(self.lower))
        } else if value > self.upper {
            Some(BoundEdge::Upper(self.upper))
        } else {
            None
        }
    }
}

impl From<Bound> for (f64, f64) {
    fn from(b: Bound) -> Self {
        (b.lower, b.upper)
    }
}

/// Sparse map of quantity -> bound. Absent quantities are never checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Quantity, (f64, f64)>", into = "BTreeMap<Quantity, (f64, f64)>")]
pub struct SafetyBounds {
    entries: BTreeMap<Quantity, Bound>,
}

impl SafetyBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a bound. Rejects `lower > upper` and NaN limits.
    pub fn insert(
        &mut self,
        quantity: Quantity,
        lower: f64,
        upper: f64,
    ) -> Result<(), ConfigError> {
        if !(lower <= upper) {
            return Err(ConfigError::InvalidBound {
                quantity: quantity.label().to_string(),
                lower,
                upper,
            });
        }
        self.entries.insert(quantity, Bound { lower, upper });
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, quantity: Quantity, lower: f64, upper: f64) -> Result<Self, ConfigError> {
        self.insert(quantity, lower, upper)?;
        Ok(self)
    }

    pub fn remove(&mut self, quantity: Quantity) -> Option<Bound> {
        self.entries.remove(&quantity)
    }

    pub fn get(&self, quantity: Quantity) -> Option<Bound> {
        self.entries.get(&quantity).copied()
    }

    /// Bounds in quantity order.
    pub fn iter(&self) -> impl Iterator<Item = (Quantity, Bound)> + '_ {
        self.entries.iter().map(|(q, b)| (*q, *b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_static(entries: &[(Quantity, f64, f64)]) -> Self {
        let entries = entries
            .iter()
            .map(|&(q, lower, upper)| (q, Bound { lower, upper }))
            .collect();
        Self { entries }
    }

    /// Envelope a successful recovery must stay inside (F-16 GCAS study).
    pub fn recovery_envelope() -> Self {
        Self::from_static(&[
            (Quantity::Altitude, 0.0, 45_000.0),
            (Quantity::LoadFactor, -2.0, 9.0),
            (Quantity::Airspeed, 300.0, 2500.0),
            (Quantity::AngleOfAttack, -10.0, 45.0),
            (Quantity::SideslipMagnitude, 0.0, 30.0),
            (Quantity::RollAcceleration, 0.0, 500.0),
        ])
    }

    /// Envelope for an ejection sequence: terrain clearance only.
    pub fn ejection_envelope() -> Self {
        Self::from_static(&[(Quantity::Altitude, 0.0, 45_000.0)])
    }
}

impl TryFrom<BTreeMap<Quantity, (f64, f64)>> for SafetyBounds {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<Quantity, (f64, f64)>) -> Result<Self, Self::Error> {
        let mut bounds = SafetyBounds::new();
        for (q, (lower, upper)) in raw {
            bounds.insert(q, lower, upper)?;
        }
        Ok(bounds)
    }
}

impl From<SafetyBounds> for BTreeMap<Quantity, (f64, f64)> {
    fn from(b: SafetyBounds) -> Self {
        b.entries.into_iter().map(|(q, b)| (q, b.into())).collect()
    }
}
