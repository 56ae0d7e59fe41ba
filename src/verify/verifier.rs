use serde::Serialize;

use crate::dynamics::state::kinematic_load_factor;
use crate::gnc::ActuatorLimits;
use crate::sim::runner::{SimulationResult, TrajectorySample};
use super::bounds::{BoundEdge, Quantity, SafetyBounds};

// ---------------------------------------------------------------------------
// Violation record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Violation {
    pub quantity: Quantity,
    /// Index of the offending sample in the trajectory.
    pub index: usize,
    pub time: f64,
    pub value: f64,
    pub edge: BoundEdge,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let edge = match self.edge {
            BoundEdge::Lower(b) => format!("below {}", b),
            BoundEdge::Upper(b) => format!("above {}", b),
            BoundEdge::Undefined => "undefined".to_string(),
        };
        write!(
            f,
            "[{:>5}] t={:>7.3}s  {} = {:.3} {} ({})",
            self.index,
            self.time,
            self.quantity,
            self.value,
            self.quantity.unit(),
            edge
        )
    }
}

// ---------------------------------------------------------------------------
// Post-hoc envelope check
// ---------------------------------------------------------------------------

/// Checks a finished trajectory against a set of [`SafetyBounds`].
///
/// Quantities without a bound are never measured. Read-only over the
/// trajectory, so one verifier can be reused across runs.
#[derive(Debug, Clone, Default)]
pub struct SafetyVerifier {
    bounds: SafetyBounds,
    limits: Option<ActuatorLimits>,
}

impl SafetyVerifier {
    pub fn new(bounds: SafetyBounds) -> Self {
        Self { bounds, limits: None }
    }

    /// Needed for `control_saturation`; without it that bound is skipped.
    pub fn with_actuator_limits(mut self, limits: ActuatorLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn bounds(&self) -> &SafetyBounds {
        &self.bounds
    }

    /// Every violation, in sample order then quantity order.
    pub fn verify<M>(&self, result: &SimulationResult<M>) -> Vec<Violation> {
        self.verify_samples(&result.samples)
    }

    pub fn verify_samples<M>(&self, samples: &[TrajectorySample<M>]) -> Vec<Violation> {
        let mut out = Vec::new();
        for index in 0..samples.len() {
            self.check_sample(samples, index, |v| {
                out.push(v);
                true
            });
        }
        out
    }

    pub fn first_violation<M>(&self, result: &SimulationResult<M>) -> Option<Violation> {
        let mut first = None;
        for index in 0..result.samples.len() {
            self.check_sample(&result.samples, index, |v| {
                first = Some(v);
                false
            });
            if first.is_some() {
                break;
            }
        }
        first
    }

    pub fn is_safe<M>(&self, result: &SimulationResult<M>) -> bool {
        self.first_violation(result).is_none()
    }

    /// Feeds each violation at `index` to `sink`; stops when `sink` returns false.
    fn check_sample<M>(
        &self,
        samples: &[TrajectorySample<M>],
        index: usize,
        mut sink: impl FnMut(Violation) -> bool,
    ) {
        let sample = &samples[index];
        for (quantity, bound) in self.bounds.iter() {
            let Some(value) = self.measure(quantity, samples, index) else {
                continue;
            };
            if let Some(edge) = bound.check(value) {
                let keep_going = sink(Violation {
                    quantity,
                    index,
                    time: sample.time,
                    value,
                    edge,
                });
                if !keep_going {
                    return;
                }
            }
        }
    }

    /// Monitored value of `quantity` at `index`, or `None` where it is not
    /// defined (roll acceleration at the first sample, saturation without
    /// limits or deflections).
    fn measure<M>(
        &self,
        quantity: Quantity,
        samples: &[TrajectorySample<M>],
        index: usize,
    ) -> Option<f64> {
        let s = &samples[index];
        let x = &s.state;
        match quantity {
            Quantity::Altitude => Some(x.alt()),
            Quantity::Airspeed => Some(x.vt()),
            Quantity::AngleOfAttack => Some(x.alpha().to_degrees()),
            Quantity::SideslipMagnitude => Some(x.beta().abs().to_degrees()),
            Quantity::LoadFactor => match s.extended {
                Some(ext) => Some(ext.nz),
                None => Some(kinematic_load_factor(x, alpha_rate(samples, index))),
            },
            Quantity::RollAcceleration => {
                let prev = samples.get(index.checked_sub(1)?)?;
                let dt = s.time - prev.time;
                if dt <= 0.0 {
                    return None;
                }
                Some(((roll_rate(s) - roll_rate(prev)) / dt).abs().to_degrees())
            }
            Quantity::ControlSaturation => {
                let limits = self.limits.as_ref()?;
                let ext = s.extended.as_ref()?;
                Some(limits.saturation(&ext.deflections))
            }
        }
    }
}

fn roll_rate<M>(s: &TrajectorySample<M>) -> f64 {
    s.extended
        .map(|e| e.ps)
        .unwrap_or_else(|| s.state.stability_roll_rate())
}

/// Backward difference; forward difference at the first sample; zero for a
/// single-sample trajectory.
fn alpha_rate<M>(samples: &[TrajectorySample<M>], index: usize) -> f64 {
    let (a, b) = if index > 0 {
        (&samples[index - 1], &samples[index])
    } else if samples.len() > 1 {
        (&samples[0], &samples[1])
    } else {
        return 0.0;
    };
    let dt = b.time - a.time;
    if dt > 0.0 {
        (b.state.alpha() - a.state.alpha()) / dt
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::autopilot::GcasMode;
    use crate::dynamics::state::{idx, ActuatorDeflections, AircraftState};
    use crate::sim::runner::{ExtendedOutputs, RunStatus};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn level(alt: f64) -> AircraftState {
        AircraftState::from_array([
            600.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, alt, 30.0,
        ])
    }

    fn trajectory(states: Vec<AircraftState>) -> SimulationResult<GcasMode> {
        let samples = states
            .into_iter()
            .enumerate()
            .map(|(i, state)| TrajectorySample {
                time: i as f64 * 0.1,
                state,
                mode: GcasMode::Standby,
                extended: None,
            })
            .collect();
        SimulationResult {
            samples,
            transitions: Vec::new(),
            status: RunStatus::TimeExhausted,
            runtime: Duration::ZERO,
            failure: None,
        }
    }

    fn altitude_only() -> SafetyBounds {
        SafetyBounds::new().with(Quantity::Altitude, 0.0, 45_000.0).unwrap()
    }

    #[test]
    fn single_altitude_excursion_at_index_42() {
        let mut states = vec![level(20_000.0); 100];
        states[42] = level(50_000.0);
        let result = trajectory(states);

        let violations = SafetyVerifier::new(altitude_only()).verify(&result);
        assert_eq!(violations.len(), 1);
        let v = violations[0];
        assert_eq!(v.quantity, Quantity::Altitude);
        assert_eq!(v.index, 42);
        assert_eq!(v.edge, BoundEdge::Upper(45_000.0));
        assert_relative_eq!(v.value, 50_000.0);
        assert_relative_eq!(v.time, 4.2, epsilon = 1e-12);
    }

    #[test]
    fn empty_bounds_certify_anything() {
        let result = trajectory(vec![level(-500.0), level(1.0e9)]);
        assert!(SafetyVerifier::new(SafetyBounds::new()).is_safe(&result));
    }

    #[test]
    fn unbounded_quantities_are_not_checked() {
        // 5000 ft/s airspeed with only altitude monitored
        let result = trajectory(vec![level(1000.0).with(idx::VT, 5000.0)]);
        assert!(SafetyVerifier::new(altitude_only()).is_safe(&result));
    }

    #[test]
    fn ordered_by_sample_then_quantity() {
        let bounds = altitude_only().with(Quantity::Airspeed, 300.0, 2500.0).unwrap();
        let result = trajectory(vec![
            level(1000.0),
            level(-10.0).with(idx::VT, 200.0),
            level(-20.0),
        ]);
        let v = SafetyVerifier::new(bounds).verify(&result);
        let keys: Vec<(usize, Quantity)> = v.iter().map(|v| (v.index, v.quantity)).collect();
        assert_eq!(
            keys,
            vec![(1, Quantity::Altitude), (1, Quantity::Airspeed), (2, Quantity::Altitude)]
        );
        assert_eq!(v[1].edge, BoundEdge::Lower(300.0));

        let first = SafetyVerifier::new(altitude_only()).first_violation(&result).unwrap();
        assert_eq!(first.index, 1);
    }

    #[test]
    fn angles_are_checked_in_degrees() {
        let bounds = SafetyBounds::new()
            .with(Quantity::AngleOfAttack, -10.0, 45.0)
            .unwrap()
            .with(Quantity::SideslipMagnitude, 0.0, 30.0)
            .unwrap();
        // 0.5 rad = 28.6 deg passes; beta = -0.6 rad = 34.4 deg fails on magnitude
        let result = trajectory(vec![level(1000.0).with(idx::ALPHA, 0.5).with(idx::BETA, -0.6)]);
        let v = SafetyVerifier::new(bounds).verify(&result);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].quantity, Quantity::SideslipMagnitude);
        assert_relative_eq!(v[0].value, 0.6_f64.to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn roll_acceleration_undefined_at_first_sample() {
        let bounds = SafetyBounds::new().with(Quantity::RollAcceleration, 0.0, 500.0).unwrap();
        // p jumps 1 rad/s over 0.1 s: 10 rad/s^2 = 573 deg/s^2
        let result = trajectory(vec![
            level(1000.0).with(idx::P, 5.0),
            level(1000.0).with(idx::P, 6.0),
        ]);
        let v = SafetyVerifier::new(bounds).verify(&result);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].index, 1);
        assert_relative_eq!(v[0].value, 10.0_f64.to_degrees(), epsilon = 1e-6);
    }

    #[test]
    fn load_factor_prefers_extended_nz() {
        let bounds = SafetyBounds::new().with(Quantity::LoadFactor, -2.0, 9.0).unwrap();
        let mut result = trajectory(vec![level(1000.0); 2]);
        assert!(SafetyVerifier::new(bounds.clone()).is_safe(&result), "level flight is 1 g");

        result.samples[1].extended = Some(ExtendedOutputs {
            nz: 9.5,
            ny: 0.0,
            ps: 0.0,
            ny_r: 0.0,
            beta_dot: 0.0,
            deflections: ActuatorDeflections::default(),
        });
        let v = SafetyVerifier::new(bounds).verify(&result);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].edge, BoundEdge::Upper(9.0));
    }

    #[test]
    fn saturation_needs_limits_and_deflections() {
        let bounds = SafetyBounds::new().with(Quantity::ControlSaturation, 0.0, 0.95).unwrap();
        let mut result = trajectory(vec![level(1000.0)]);
        result.samples[0].extended = Some(ExtendedOutputs {
            nz: 1.0,
            ny: 0.0,
            ps: 0.0,
            ny_r: 0.0,
            beta_dot: 0.0,
            deflections: ActuatorDeflections {
                throttle: 0.3,
                elevator: -25.0,
                aileron: 0.0,
                rudder: 0.0,
            },
        });

        assert!(SafetyVerifier::new(bounds.clone()).is_safe(&result));
        let with_limits =
            SafetyVerifier::new(bounds).with_actuator_limits(ActuatorLimits::default());
        let v = with_limits.verify(&result);
        assert_eq!(v.len(), 1);
        assert_relative_eq!(v[0].value, 1.0);
    }

    #[test]
    fn nan_sample_is_reported_undefined() {
        let result = trajectory(vec![level(f64::NAN)]);
        let v = SafetyVerifier::new(altitude_only()).verify(&result);
        assert_eq!(v[0].edge, BoundEdge::Undefined);
    }

    fn altitudes() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-5_000.0..60_000.0f64, 1..40)
    }

    proptest! {
        #[test]
        fn narrowing_only_adds_violations(
            alts in altitudes(),
            lo in -1_000.0..20_000.0f64,
            width in 0.0..40_000.0f64,
            shrink_lo in 0.0..5_000.0f64,
            shrink_hi in 0.0..5_000.0f64,
        ) {
            let result = trajectory(alts.into_iter().map(level).collect());
            let hi = lo + width;
            let wide = SafetyBounds::new().with(Quantity::Altitude, lo, hi).unwrap();
            let n_lo = (lo + shrink_lo).min(hi);
            let n_hi = (hi - shrink_hi).max(n_lo);
            let narrow = SafetyBounds::new().with(Quantity::Altitude, n_lo, n_hi).unwrap();

            let indices = |b: SafetyBounds| -> Vec<usize> {
                SafetyVerifier::new(b).verify(&result).iter().map(|v| v.index).collect()
            };
            let before = indices(wide);
            let after = indices(narrow);
            for i in before {
                prop_assert!(after.contains(&i));
            }
        }

        #[test]
        fn verify_is_idempotent(alts in altitudes()) {
            let result = trajectory(alts.into_iter().map(level).collect());
            let verifier = SafetyVerifier::new(SafetyBounds::recovery_envelope());
            prop_assert_eq!(verifier.verify(&result), verifier.verify(&result));
        }
    }
}
