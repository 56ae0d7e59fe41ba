use serde::{Deserialize, Serialize};

use crate::autopilot::ReferenceCommand;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Autopilot configuration
// ---------------------------------------------------------------------------

/// Guard thresholds, gains and dwell times shared by both autopilot variants.
///
/// Copied into the autopilot at construction and never mutated during a run.
/// Sweeps build a new autopilot per run instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutopilotConfig {
    pub eps_phi: f64,             // rad, max |roll| from wings level
    pub eps_p: f64,               // rad/s, max |roll rate| for level
    pub eps_pitch: f64,           // rad, max |pitch| for flat
    pub path_goal: f64,           // rad, min flight path angle for nose high
    pub k_prop: f64,              // roll PD proportional gain
    pub k_der: f64,               // roll PD derivative gain
    pub flight_deck: f64,         // ft, recovery floor
    pub min_pull_time: f64,       // s, pull dwell
    pub nz_des: f64,              // g, pull load factor
    pub alt_bounds: (f64, f64),   // ft, ejection envelope
    pub vt_bounds: (f64, f64),    // ft/s, ejection envelope
    pub max_eject_speed: f64,     // ft/s, pull -> eject threshold
    pub waiting_time: f64,        // s, reaction delay before engaging
    pub waiting_cmd: ReferenceCommand,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            eps_phi: 10.0_f64.to_radians(),
            eps_p: 10.0_f64.to_radians(),
            eps_pitch: 10.0_f64.to_radians(),
            path_goal: 0.0,
            k_prop: 4.0,
            k_der: 2.0,
            flight_deck: 1000.0,
            min_pull_time: 2.0,
            nz_des: 5.0,
            alt_bounds: (0.0, 55_000.0),
            vt_bounds: (0.0, 1012.69),
            max_eject_speed: 600.0,
            waiting_time: 2.0,
            waiting_cmd: ReferenceCommand::ZERO,
        }
    }
}

impl AutopilotConfig {
    /// Reject configurations no guard can be evaluated against.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("eps_phi", self.eps_phi),
            ("eps_p", self.eps_p),
            ("eps_pitch", self.eps_pitch),
            ("max_eject_speed", self.max_eject_speed),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigError::invalid(name, format!("must be positive, got {v}")));
            }
        }

        let non_negative = [
            ("min_pull_time", self.min_pull_time),
            ("waiting_time", self.waiting_time),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::invalid(name, format!("must be >= 0, got {v}")));
            }
        }

        let finite = [
            ("path_goal", self.path_goal),
            ("k_prop", self.k_prop),
            ("k_der", self.k_der),
            ("flight_deck", self.flight_deck),
            ("nz_des", self.nz_des),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(ConfigError::invalid(name, "must be finite"));
            }
        }
        if !self.waiting_cmd.as_array().iter().all(|v| v.is_finite()) {
            return Err(ConfigError::invalid("waiting_cmd", "must be finite"));
        }

        for (name, (lo, hi)) in [("alt_bounds", self.alt_bounds), ("vt_bounds", self.vt_bounds)] {
            if !(lo <= hi) {
                return Err(ConfigError::InvalidBound {
                    quantity: name.to_string(),
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(())
    }
}
