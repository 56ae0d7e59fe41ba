//! Guard predicates and command builders shared by the autopilot variants.
//!
//! All functions are total over finite inputs and side-effect free.

use std::f64::consts::TAU;

use crate::autopilot::{AutopilotConfig, ReferenceCommand};
use crate::dynamics::state::AircraftState;

// ---------------------------------------------------------------------------
// Angle reduction
// ---------------------------------------------------------------------------

/// Deviation of `angle` from the nearest multiple of a full turn.
///
/// Roll can wind through several rotations during a recovery, so "level" is
/// the closest of 0, ±2π, ±4π, ... rather than the raw value.
pub fn reduce_to_nearest_level(angle: f64) -> f64 {
    let turns = (angle / TAU).round();
    angle - TAU * turns
}

// ---------------------------------------------------------------------------
// Attitude guards
// ---------------------------------------------------------------------------

pub fn are_wings_level(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    reduce_to_nearest_level(x.phi()).abs() < cfg.eps_phi
}

pub fn is_roll_rate_low(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    x.p().abs() < cfg.eps_p
}

pub fn is_pitch_flat(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    reduce_to_nearest_level(x.theta()).abs() < cfg.eps_pitch
}

/// Wings level with the roll rate settled.
pub fn is_level(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    are_wings_level(x, cfg) && is_roll_rate_low(x, cfg)
}

/// Level and with the nose inside the pitch tolerance.
pub fn is_flat(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    is_level(x, cfg) && is_pitch_flat(x, cfg)
}

// ---------------------------------------------------------------------------
// Envelope / altitude guards
// ---------------------------------------------------------------------------

pub fn within_envelope(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    let (alt_lo, alt_hi) = cfg.alt_bounds;
    let (vt_lo, vt_hi) = cfg.vt_bounds;
    (alt_lo..=alt_hi).contains(&x.alt()) && (vt_lo..=vt_hi).contains(&x.vt())
}

/// Flat attitude inside the ejection envelope.
pub fn can_eject(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    is_flat(x, cfg) && within_envelope(x, cfg)
}

/// Flight path angle (pitch minus alpha, reduced) above the goal.
pub fn is_nose_high_enough(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    reduce_to_nearest_level(x.theta() - x.alpha()) > cfg.path_goal
}

pub fn is_above_flight_deck(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    x.alt() >= cfg.flight_deck
}

/// Neither pointed up enough nor high enough: recovery is still required.
pub fn needs_recovery(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    !is_nose_high_enough(x, cfg) && !is_above_flight_deck(x, cfg)
}

// ---------------------------------------------------------------------------
// Time / speed guards
// ---------------------------------------------------------------------------

pub fn waiting_elapsed(t: f64, cfg: &AutopilotConfig) -> bool {
    t >= cfg.waiting_time
}

pub fn pull_dwell_elapsed(t: f64, started_at: f64, cfg: &AutopilotConfig) -> bool {
    t >= started_at + cfg.min_pull_time
}

pub fn slow_enough_to_eject(x: &AircraftState, cfg: &AutopilotConfig) -> bool {
    x.vt() <= cfg.max_eject_speed
}

// ---------------------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------------------

/// PD roll toward the nearest wings-level attitude.
pub fn roll_wings_level(x: &AircraftState, cfg: &AutopilotConfig) -> ReferenceCommand {
    let ps = -reduce_to_nearest_level(x.phi()) * cfg.k_prop - x.p() * cfg.k_der;
    ReferenceCommand {
        ps,
        ..ReferenceCommand::ZERO
    }
}

pub fn pull_nose_level(cfg: &AutopilotConfig) -> ReferenceCommand {
    ReferenceCommand {
        nz: cfg.nz_des,
        ..ReferenceCommand::ZERO
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::idx;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn state() -> AircraftState {
        AircraftState::from_array([
            540.0, 0.037, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3600.0, 9.0,
        ])
    }

    #[test]
    fn reduction_picks_nearest_turn() {
        assert_relative_eq!(reduce_to_nearest_level(0.2), 0.2);
        assert_relative_eq!(reduce_to_nearest_level(TAU + 0.2), 0.2, epsilon = 1e-12);
        assert_relative_eq!(reduce_to_nearest_level(-3.0 * TAU - 0.2), -0.2, epsilon = 1e-12);
        assert_relative_eq!(reduce_to_nearest_level(TAU - 0.1), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn wings_level_scenario_with_fifteen_degree_tolerance() {
        let cfg = AutopilotConfig {
            eps_phi: 15.0_f64.to_radians(),
            ..Default::default()
        };
        let x = state().with(idx::PHI, 0.2).with(idx::P, 0.0);
        assert!(are_wings_level(&x, &cfg));

        let cmd = roll_wings_level(&x, &cfg);
        assert_relative_eq!(cmd.ps, -0.2 * cfg.k_prop);
        assert_eq!(cmd.nz, 0.0);
        assert_eq!(cmd.ny_r, 0.0);
        assert_eq!(cmd.throttle, 0.0);
    }

    #[test]
    fn point_two_radians_exceeds_ten_degrees() {
        // 0.2 rad is ~11.5 deg
        let cfg = AutopilotConfig::default();
        let x = state().with(idx::PHI, 0.2);
        assert!(!are_wings_level(&x, &cfg));
    }

    #[test]
    fn wound_up_roll_is_still_level() {
        let cfg = AutopilotConfig::default();
        let x = state().with(idx::PHI, 4.0 * TAU + 0.05);
        assert!(are_wings_level(&x, &cfg));
        let cmd = roll_wings_level(&x, &cfg);
        assert_relative_eq!(cmd.ps, -0.05 * cfg.k_prop, epsilon = 1e-9);
    }

    #[test]
    fn flatness_needs_pitch_inside_tolerance() {
        let cfg = AutopilotConfig::default();
        let nose_down = state().with(idx::THETA, -0.5);
        assert!(is_level(&nose_down, &cfg));
        assert!(!is_flat(&nose_down, &cfg));
        assert!(is_flat(&state(), &cfg));
    }

    #[test]
    fn ejection_envelope_checks_speed_and_altitude() {
        let cfg = AutopilotConfig::default();
        assert!(can_eject(&state(), &cfg));
        assert!(!can_eject(&state().with(idx::VT, 1500.0), &cfg));
        assert!(!can_eject(&state().with(idx::ALT, -10.0), &cfg));
    }

    #[test]
    fn recovery_needed_only_when_low_and_nose_down() {
        let cfg = AutopilotConfig::default();
        let low_dive = state().with(idx::ALT, 500.0).with(idx::THETA, -0.3);
        assert!(needs_recovery(&low_dive, &cfg));
        assert!(!needs_recovery(&low_dive.with(idx::ALT, 1000.0), &cfg));
        assert!(!needs_recovery(&low_dive.with(idx::THETA, 0.3), &cfg));
    }

    #[test]
    fn dwell_boundary_is_inclusive() {
        let cfg = AutopilotConfig::default();
        assert!(!pull_dwell_elapsed(1.999, 0.0, &cfg));
        assert!(pull_dwell_elapsed(2.0, 0.0, &cfg));
    }

    proptest! {
        #[test]
        fn wings_level_invariant_under_full_turns(phi in -3.1f64..3.1, k in -20i32..20) {
            let cfg = AutopilotConfig::default();
            let x = state().with(idx::PHI, phi);
            let wound = state().with(idx::PHI, phi + TAU * k as f64);
            prop_assert_eq!(are_wings_level(&x, &cfg), are_wings_level(&wound, &cfg));
        }

        #[test]
        fn reduced_angle_stays_within_half_turn(angle in -1.0e4f64..1.0e4) {
            let r = reduce_to_nearest_level(angle);
            prop_assert!(r.abs() <= std::f64::consts::PI + 1e-9);
        }
    }
}
