use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::autopilot::guards;
use crate::autopilot::{Autopilot, AutopilotConfig, ReferenceCommand};
use crate::dynamics::state::AircraftState;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Recovery autopilot modes. Monotone: `Eject` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcasMode {
    Standby,
    Recover,
    Eject,
}

impl GcasMode {
    pub const ALL: [GcasMode; 3] = [GcasMode::Standby, GcasMode::Recover, GcasMode::Eject];

    pub fn label(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Recover => "recover",
            Self::Eject => "eject",
        }
    }
}

impl fmt::Display for GcasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GcasMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.label() == s)
            .ok_or_else(|| ConfigError::UnknownMode {
                autopilot: "gcas",
                name: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Pure transition / command functions
// ---------------------------------------------------------------------------

/// Guard of the current mode; `Some(next)` when it fires.
pub fn next_mode(mode: GcasMode, x: &AircraftState, cfg: &AutopilotConfig) -> Option<GcasMode> {
    match mode {
        GcasMode::Standby if guards::needs_recovery(x, cfg) => Some(GcasMode::Recover),
        GcasMode::Recover if guards::can_eject(x, cfg) => Some(GcasMode::Eject),
        _ => None,
    }
}

/// Roll wings level first, then pull until the nose is inside the pitch
/// tolerance.
pub fn command(mode: GcasMode, x: &AircraftState, cfg: &AutopilotConfig) -> ReferenceCommand {
    match mode {
        GcasMode::Standby | GcasMode::Eject => ReferenceCommand::ZERO,
        GcasMode::Recover => {
            let mut cmd = guards::roll_wings_level(x, cfg);
            let nose_low = guards::reduce_to_nearest_level(x.theta()) < -cfg.eps_pitch;
            if guards::are_wings_level(x, cfg) && nose_low {
                cmd.nz = cfg.nz_des;
            }
            cmd
        }
    }
}

// ---------------------------------------------------------------------------
// Autopilot
// ---------------------------------------------------------------------------

/// Ground-collision recovery autopilot: levels the aircraft and commits to
/// ejection once it is flat inside the ejection envelope.
#[derive(Debug, Clone)]
pub struct GcasAutopilot {
    mode: GcasMode,
    cfg: AutopilotConfig,
    last_transition_at: Option<f64>,
}

impl GcasAutopilot {
    pub fn new(init_mode: GcasMode, cfg: AutopilotConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            mode: init_mode,
            cfg,
            last_transition_at: None,
        })
    }

    /// Construct from a mode name such as `"standby"`.
    pub fn with_mode_name(init_mode: &str, cfg: AutopilotConfig) -> Result<Self, ConfigError> {
        Self::new(init_mode.parse()?, cfg)
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.cfg
    }
}

impl Autopilot for GcasAutopilot {
    type Mode = GcasMode;

    fn mode(&self) -> GcasMode {
        self.mode
    }

    fn advance_discrete_mode(&mut self, t: f64, x: &AircraftState) -> bool {
        // at most one transition per instant
        if self.last_transition_at == Some(t) {
            return false;
        }
        match next_mode(self.mode, x, &self.cfg) {
            Some(next) => {
                self.mode = next;
                self.last_transition_at = Some(t);
                true
            }
            None => false,
        }
    }

    fn reference_command(&self, _t: f64, x: &AircraftState) -> ReferenceCommand {
        command(self.mode, x, &self.cfg)
    }

    fn is_finished(&self, _t: f64, _x: &AircraftState) -> bool {
        self.mode == GcasMode::Eject
    }

    fn name(&self) -> &str {
        "GcasAutopilot"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::idx;
    use proptest::prelude::*;

    fn low_dive() -> AircraftState {
        AircraftState::from_array([
            700.0, 0.04, 0.0, 0.6, -0.4, 0.0, 0.3, 0.0, 0.0, 0.0, 0.0, 800.0, 9.0,
        ])
    }

    fn flat_cruise() -> AircraftState {
        AircraftState::from_array([
            500.0, 0.05, 0.0, 0.0, 0.02, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 900.0, 9.0,
        ])
    }

    #[test]
    fn unknown_mode_name_fails_fast() {
        let err = GcasAutopilot::with_mode_name("roll", AutopilotConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMode { autopilot: "gcas", .. }));
        assert!(GcasAutopilot::with_mode_name("recover", AutopilotConfig::default()).is_ok());
    }

    #[test]
    fn standby_engages_recovery_when_low_and_diving() {
        let mut ap = GcasAutopilot::new(GcasMode::Standby, AutopilotConfig::default()).unwrap();
        assert!(ap.advance_discrete_mode(0.0, &low_dive()));
        assert_eq!(ap.mode(), GcasMode::Recover);
    }

    #[test]
    fn standby_holds_above_flight_deck() {
        let mut ap = GcasAutopilot::new(GcasMode::Standby, AutopilotConfig::default()).unwrap();
        assert!(!ap.advance_discrete_mode(0.0, &low_dive().with(idx::ALT, 5000.0)));
        assert_eq!(ap.mode(), GcasMode::Standby);
    }

    #[test]
    fn one_transition_per_call() {
        // low and flat: Standby guard and Recover guard both hold
        let x = flat_cruise().with(idx::THETA, 0.0);
        let mut ap = GcasAutopilot::new(GcasMode::Standby, AutopilotConfig::default()).unwrap();
        assert!(ap.advance_discrete_mode(1.0, &x));
        assert_eq!(ap.mode(), GcasMode::Recover);
        // same instant: idempotent
        assert!(!ap.advance_discrete_mode(1.0, &x));
        assert_eq!(ap.mode(), GcasMode::Recover);
        // next instant: the recover guard fires
        assert!(ap.advance_discrete_mode(1.1, &x));
        assert_eq!(ap.mode(), GcasMode::Eject);
    }

    #[test]
    fn recover_rolls_before_pulling() {
        let cfg = AutopilotConfig::default();
        let banked = command(GcasMode::Recover, &low_dive(), &cfg);
        assert_eq!(banked.nz, 0.0);
        assert!(banked.ps < 0.0);

        let wings_level = low_dive().with(idx::PHI, 0.0).with(idx::P, 0.0);
        let level = command(GcasMode::Recover, &wings_level, &cfg);
        assert_eq!(level.nz, cfg.nz_des);
    }

    #[test]
    fn standby_and_eject_command_nothing() {
        let cfg = AutopilotConfig::default();
        assert!(command(GcasMode::Standby, &low_dive(), &cfg).is_zero());
        assert!(command(GcasMode::Eject, &low_dive(), &cfg).is_zero());
    }

    #[test]
    fn reference_command_does_not_mutate_mode() {
        let ap = GcasAutopilot::new(GcasMode::Recover, AutopilotConfig::default()).unwrap();
        let a = ap.reference_command(3.0, &low_dive());
        let b = ap.reference_command(3.0, &low_dive());
        assert_eq!(a, b);
        assert_eq!(ap.mode(), GcasMode::Recover);
    }

    proptest! {
        #[test]
        fn eject_is_terminal(
            alt in -1000.0f64..60_000.0,
            vt in 0.0f64..2500.0,
            phi in -10.0f64..10.0,
            theta in -1.5f64..1.5,
            steps in 1usize..50,
        ) {
            let mut ap = GcasAutopilot::new(GcasMode::Eject, AutopilotConfig::default()).unwrap();
            let x = flat_cruise()
                .with(idx::ALT, alt)
                .with(idx::VT, vt)
                .with(idx::PHI, phi)
                .with(idx::THETA, theta);
            for i in 0..steps {
                let t = i as f64 * 0.1;
                prop_assert!(!ap.advance_discrete_mode(t, &x));
                prop_assert_eq!(ap.mode(), GcasMode::Eject);
                prop_assert!(ap.is_finished(t, &x));
            }
        }
    }
}
