use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autopilot::AutopilotConfig;
use crate::dynamics::state::AircraftState;
use crate::error::ConfigError;
use crate::sim::runner::SimConfig;
use crate::verify::SafetyBounds;

// ---------------------------------------------------------------------------
// Scenario: initial condition + every config a run needs
// ---------------------------------------------------------------------------

/// Everything needed to run GCAS, fall back to AES, and judge both runs.
///
/// Omitted fields take their defaults, so a scenario file only needs to
/// name what differs from the stock study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    pub initial_state: AircraftState,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub gcas: AutopilotConfig,
    #[serde(default)]
    pub aes: AutopilotConfig,
    #[serde(default = "SafetyBounds::recovery_envelope")]
    pub recovery_bounds: SafetyBounds,
    #[serde(default = "SafetyBounds::ejection_envelope")]
    pub ejection_bounds: SafetyBounds,
}

fn default_name() -> String {
    "unnamed".into()
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading scenario");
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_state.is_finite() {
            return Err(ConfigError::invalid("initial_state", "must be finite"));
        }
        if let Err(e) = self.sim.validate() {
            return Err(ConfigError::invalid("sim", e.to_string()));
        }
        self.gcas.validate()?;
        self.aes.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preset scenarios
// ---------------------------------------------------------------------------

pub mod presets {
    use std::f64::consts::PI;

    use super::*;
    use crate::autopilot::ReferenceCommand;

    /// Steep inverted dive at 10,200 ft with a 2.2 s pilot reaction delay,
    /// during which the pilot holds a 2.2 rad/s roll.
    pub fn dive_recovery() -> Scenario {
        let initial_state = AircraftState::from_array([
            2040.0,                  // vt, ft/s
            2.1215_f64.to_radians(), // alpha, trim
            0.0,                     // beta
            0.0,                     // phi
            -0.35 * PI,              // theta
            0.8 * PI,                // psi
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            10_200.0, // alt, ft
            9.0,      // power
        ]);

        let waiting_cmd = ReferenceCommand { ps: 2.2, ..ReferenceCommand::ZERO };
        let gcas = AutopilotConfig {
            waiting_time: 2.2,
            waiting_cmd,
            ..Default::default()
        };
        let aes = AutopilotConfig {
            waiting_time: 2.2,
            waiting_cmd,
            k_prop: 1.4,
            k_der: 0.0,
            eps_p: 20.0_f64.to_radians(),
            eps_phi: 15.0_f64.to_radians(),
            ..Default::default()
        };

        Scenario {
            name: "dive-recovery".into(),
            initial_state,
            sim: SimConfig::default(),
            gcas,
            aes,
            recovery_bounds: SafetyBounds::recovery_envelope(),
            ejection_bounds: SafetyBounds::ejection_envelope(),
        }
    }

    /// Low, slow and nose-down: GCAS cannot pull out in time.
    pub fn low_altitude_dive() -> Scenario {
        let base = dive_recovery();
        Scenario {
            name: "low-altitude-dive".into(),
            initial_state: base.initial_state.with(crate::dynamics::state::idx::ALT, 800.0),
            ..base
        }
    }
}
