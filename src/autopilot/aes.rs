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

/// Ejection autopilot modes.
///
/// Cyclic: `Eject` falls back to `Roll` while the aircraft is neither nose
/// high nor above the flight deck. `Pull` carries the time it was entered so
/// the dwell guard stays a function of the mode alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesMode {
    Waiting,
    Roll,
    Pull { started_at: f64 },
    Eject,
}

impl AesMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Roll => "roll",
            Self::Pull { .. } => "pull",
            Self::Eject => "eject",
        }
    }
}

impl fmt::Display for AesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AesMode {
    type Err = ConfigError;

    /// `"pull"` parses as a pull started at t = 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "roll" => Ok(Self::Roll),
            "pull" => Ok(Self::Pull { started_at: 0.0 }),
            "eject" => Ok(Self::Eject),
            other => Err(ConfigError::UnknownMode {
                autopilot: "aes",
                name: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Pure transition / command functions
// ---------------------------------------------------------------------------

/// Guard of the current mode; `Some(next)` when it fires.
pub fn next_mode(
    mode: AesMode,
    t: f64,
    x: &AircraftState,
    cfg: &AutopilotConfig,
) -> Option<AesMode> {
    match mode {
        AesMode::Waiting if guards::waiting_elapsed(t, cfg) => Some(AesMode::Roll),
        AesMode::Roll if guards::is_level(x, cfg) => Some(AesMode::Pull { started_at: t }),
        AesMode::Pull { started_at }
            if guards::pull_dwell_elapsed(t, started_at, cfg)
                && guards::slow_enough_to_eject(x, cfg) =>
        {
            Some(AesMode::Eject)
        }
        AesMode::Eject if guards::needs_recovery(x, cfg) => Some(AesMode::Roll),
        _ => None,
    }
}

pub fn command(mode: AesMode, x: &AircraftState, cfg: &AutopilotConfig) -> ReferenceCommand {
    match mode {
        AesMode::Waiting => cfg.waiting_cmd,
        AesMode::Roll => guards::roll_wings_level(x, cfg),
        AesMode::Pull { .. } => guards::pull_nose_level(cfg),
        AesMode::Eject => ReferenceCommand::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Autopilot
// ---------------------------------------------------------------------------

/// Automatic ejection autopilot: after a reaction delay, rolls wings level,
/// pulls for at least `min_pull_time`, and ejects once slow enough.
#[derive(Debug, Clone)]
pub struct AesAutopilot {
    mode: AesMode,
    cfg: AutopilotConfig,
    last_transition_at: Option<f64>,
}

impl AesAutopilot {
    pub fn new(init_mode: AesMode, cfg: AutopilotConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        if let AesMode::Pull { started_at } = init_mode {
            if !started_at.is_finite() {
                return Err(ConfigError::invalid("started_at", "pull start time must be finite"));
            }
        }
        Ok(Self {
            mode: init_mode,
            cfg,
            last_transition_at: None,
        })
    }

    /// Construct from a mode name such as `"waiting"`.
    pub fn with_mode_name(init_mode: &str, cfg: AutopilotConfig) -> Result<Self, ConfigError> {
        Self::new(init_mode.parse()?, cfg)
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.cfg
    }
}

impl Autopilot for AesAutopilot {
    type Mode = AesMode;

    fn mode(&self) -> AesMode {
        self.mode
    }

    fn advance_discrete_mode(&mut self, t: f64, x: &AircraftState) -> bool {
        // at most one transition per instant
        if self.last_transition_at == Some(t) {
            return false;
        }
        match next_mode(self.mode, t, x, &self.cfg) {
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

    /// Ejection is committed once the fallback guard no longer holds.
    fn is_finished(&self, _t: f64, x: &AircraftState) -> bool {
        self.mode == AesMode::Eject && !guards::needs_recovery(x, &self.cfg)
    }

    fn name(&self) -> &str {
        "AesAutopilot"
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

    fn slow_level() -> AircraftState {
        AircraftState::from_array([
            400.0, 0.1, 0.0, 0.0, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3000.0, 9.0,
        ])
    }

    fn cfg() -> AutopilotConfig {
        AutopilotConfig {
            min_pull_time: 2.0,
            max_eject_speed: 600.0,
            waiting_time: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn mode_names_round_trip() {
        for name in ["waiting", "roll", "pull", "eject"] {
            let m: AesMode = name.parse().unwrap();
            assert_eq!(m.to_string(), name);
        }
        assert!(matches!(
            "standby".parse::<AesMode>(),
            Err(ConfigError::UnknownMode { autopilot: "aes", .. })
        ));
    }

    #[test]
    fn waiting_is_time_triggered() {
        let mut ap = AesAutopilot::new(AesMode::Waiting, cfg()).unwrap();
        // state is irrelevant to the waiting guard
        let x = slow_level().with(idx::PHI, 2.0);
        assert!(!ap.advance_discrete_mode(0.99, &x));
        assert!(ap.advance_discrete_mode(1.0, &x));
        assert_eq!(ap.mode(), AesMode::Roll);
    }

    #[test]
    fn waiting_emits_configured_command() {
        let mut c = cfg();
        c.waiting_cmd.ps = 2.2;
        let ap = AesAutopilot::new(AesMode::Waiting, c).unwrap();
        assert_eq!(ap.reference_command(0.0, &slow_level()).ps, 2.2);
    }

    #[test]
    fn roll_to_pull_records_start_time() {
        let mut ap = AesAutopilot::new(AesMode::Roll, cfg()).unwrap();
        assert!(ap.advance_discrete_mode(3.5, &slow_level()));
        assert_eq!(ap.mode(), AesMode::Pull { started_at: 3.5 });
        assert_eq!(ap.reference_command(3.5, &slow_level()).nz, ap.config().nz_des);
    }

    #[test]
    fn pull_dwell_blocks_early_ejection() {
        let mut ap = AesAutopilot::new(AesMode::Pull { started_at: 0.0 }, cfg()).unwrap();
        let x = slow_level();
        assert!(x.vt() <= ap.config().max_eject_speed);

        assert!(!ap.advance_discrete_mode(1.0, &x), "speed guard alone must not eject");
        assert!(matches!(ap.mode(), AesMode::Pull { .. }));
        assert!(!ap.advance_discrete_mode(1.9, &x));

        assert!(ap.advance_discrete_mode(2.0, &x));
        assert_eq!(ap.mode(), AesMode::Eject);
    }

    #[test]
    fn pull_holds_while_fast() {
        let mut ap = AesAutopilot::new(AesMode::Pull { started_at: 0.0 }, cfg()).unwrap();
        assert!(!ap.advance_discrete_mode(5.0, &slow_level().with(idx::VT, 900.0)));
    }

    #[test]
    fn eject_falls_back_to_roll_when_low_and_nose_down() {
        let mut ap = AesAutopilot::new(AesMode::Eject, cfg()).unwrap();
        let low_dive = slow_level().with(idx::ALT, 500.0).with(idx::THETA, -0.4);
        assert!(!ap.is_finished(0.0, &low_dive));
        assert!(ap.advance_discrete_mode(0.0, &low_dive));
        assert_eq!(ap.mode(), AesMode::Roll);
    }

    #[test]
    fn eject_commits_when_nose_high() {
        let mut ap = AesAutopilot::new(AesMode::Eject, cfg()).unwrap();
        let climbing_low = slow_level().with(idx::ALT, 500.0);
        assert!(ap.is_finished(0.0, &climbing_low));
        assert!(!ap.advance_discrete_mode(0.0, &climbing_low));
        assert!(ap.reference_command(0.0, &climbing_low).is_zero());
    }

    #[test]
    fn same_instant_is_idempotent() {
        let mut ap = AesAutopilot::new(AesMode::Waiting, cfg()).unwrap();
        let x = slow_level();
        assert!(ap.advance_discrete_mode(1.0, &x));
        // Roll guard also holds on x, but not within the same instant
        assert!(!ap.advance_discrete_mode(1.0, &x));
        assert_eq!(ap.mode(), AesMode::Roll);
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let bad = AutopilotConfig {
            eps_phi: -1.0,
            ..Default::default()
        };
        assert!(AesAutopilot::new(AesMode::Roll, bad).is_err());
    }

    proptest! {
        #[test]
        fn commands_are_side_effect_free(
            phi in -20.0f64..20.0,
            p in -3.0f64..3.0,
            t in 0.0f64..20.0,
            which in 0usize..4,
        ) {
            let pull = AesMode::Pull { started_at: 0.5 };
            let modes = [AesMode::Waiting, AesMode::Roll, pull, AesMode::Eject];
            let mode = modes[which];
            let ap = AesAutopilot::new(mode, cfg()).unwrap();
            let x = slow_level().with(idx::PHI, phi).with(idx::P, p);
            let a = ap.reference_command(t, &x);
            let b = ap.reference_command(t, &x);
            prop_assert_eq!(a, b);
            prop_assert_eq!(ap.mode(), mode);
        }
    }
}
