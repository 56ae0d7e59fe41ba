use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::autopilot::{Autopilot, ReferenceCommand};
use crate::dynamics::plant::Plant;
use crate::dynamics::point_mass::PointMassAircraft;
use crate::dynamics::state::{idx, ActuatorDeflections, AircraftState};
use crate::error::{IntegrationError, SimError};
use crate::gnc::{LowLevelController, RateTrackingController};
use super::event::ModeTransition;
use super::integrator::IntegratorKind;

// ---------------------------------------------------------------------------
// Driver configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// State and mode only.
    Fixed,
    /// Also attach load factors, roll rate and deflections to each sample.
    #[default]
    Extended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub step: f64,        // s, discrete step
    pub time_budget: f64, // s, hard stop
    pub output: OutputMode,
    pub integrator: IntegratorKind,
    /// Halt once a run exceeds this many mode transitions. `None` = unbounded.
    pub max_transitions: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            step: 1.0 / 30.0, // 30 Hz supervisory rate
            time_budget: 15.0,
            output: OutputMode::Extended,
            integrator: IntegratorKind::Rk45,
            max_transitions: Some(64),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(SimError::InvalidStep(self.step));
        }
        if !(self.time_budget.is_finite() && self.time_budget > 0.0) {
            return Err(SimError::InvalidTimeBudget(self.time_budget));
        }
        Ok(())
    }

    /// Number of discrete steps needed to reach the time budget. The last
    /// one is shortened when the budget is not a whole number of steps.
    pub fn num_steps(&self) -> usize {
        (self.time_budget / self.step - 1e-9).ceil().max(0.0) as usize
    }

    /// End time of step `i`, never past the budget.
    pub fn step_end(&self, i: usize) -> f64 {
        ((i + 1) as f64 * self.step).min(self.time_budget)
    }
}

// ---------------------------------------------------------------------------
// Trajectory log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The autopilot reached a terminal mode.
    Completed,
    /// The time budget ran out first.
    TimeExhausted,
    /// The integrator failed; the trajectory is partial.
    IntegrationFailed,
    /// The transition cap was exceeded; the trajectory is partial.
    TransitionLimit,
}

impl RunStatus {
    /// Whether the trajectory covers the whole run.
    pub fn is_complete(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::TimeExhausted)
    }
}

/// Diagnostic scalars attached in `OutputMode::Extended`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtendedOutputs {
    pub nz: f64,       // normal load factor, g
    pub ny: f64,       // lateral load factor, g
    pub ps: f64,       // stability-axis roll rate, rad/s
    pub ny_r: f64,     // ny + r
    pub beta_dot: f64, // sideslip rate, rad/s
    pub deflections: ActuatorDeflections,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySample<M> {
    pub time: f64,
    pub state: AircraftState,
    /// Mode in force over the step that produced this sample.
    pub mode: M,
    pub extended: Option<ExtendedOutputs>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult<M> {
    pub samples: Vec<TrajectorySample<M>>,
    pub transitions: Vec<ModeTransition<M>>,
    pub status: RunStatus,
    pub runtime: Duration,
    pub failure: Option<IntegrationError>,
}

impl<M: Copy> SimulationResult<M> {
    pub fn final_sample(&self) -> Option<&TrajectorySample<M>> {
        self.samples.last()
    }

    pub fn min_altitude(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.state.alt()).reduce(f64::min)
    }
}

fn diagnostics<P, L>(
    plant: &P,
    llc: &L,
    t: f64,
    x: &AircraftState,
    reference: &ReferenceCommand,
) -> ExtendedOutputs
where
    P: Plant + ?Sized,
    L: LowLevelController + ?Sized,
{
    let u = llc.actuate(x, reference);
    let xd = plant.derivative(t, x, &u);
    let (nz, ny) = plant.load_factors(t, x, &u, &xd);
    ExtendedOutputs {
        nz,
        ny,
        ps: x.stability_roll_rate(),
        ny_r: ny + x.r(),
        beta_dot: xd.get(idx::BETA),
        deflections: u,
    }
}

// ---------------------------------------------------------------------------
// Closed-loop simulation
// ---------------------------------------------------------------------------

/// Run the autopilot against a plant and low-level controller.
///
/// Each step: advance the discrete mode, take the reference command, then
/// integrate with that reference held over `[t, t + step]` (the LLC is
/// evaluated inside every derivative call). Stops at the time budget or when
/// the autopilot reports a terminal mode.
///
/// Precondition failures return `Err`. Numerical failure is reported through
/// `RunStatus::IntegrationFailed` with every earlier sample kept.
pub fn simulate_with<A, P, L>(
    initial: &AircraftState,
    config: &SimConfig,
    autopilot: &mut A,
    plant: &P,
    llc: &L,
) -> Result<SimulationResult<A::Mode>, SimError>
where
    A: Autopilot + ?Sized,
    P: Plant + ?Sized,
    L: LowLevelController + ?Sized,
{
    config.validate()?;
    let started = Instant::now();

    let n_steps = config.num_steps();
    let extended = config.output == OutputMode::Extended;
    let mut integrator = config.integrator.build();

    let mut samples = Vec::with_capacity((n_steps + 1).min(200_000));
    let mut transitions = Vec::new();
    let mut status = RunStatus::TimeExhausted;
    let mut failure = None;

    let mut x = *initial;
    samples.push(TrajectorySample {
        time: 0.0,
        state: x,
        mode: autopilot.mode(),
        extended: extended.then(|| {
            diagnostics(plant, llc, 0.0, &x, &autopilot.reference_command(0.0, &x))
        }),
    });

    for i in 0..n_steps {
        let t = i as f64 * config.step;

        if autopilot.is_finished(t, &x) {
            status = RunStatus::Completed;
            break;
        }

        // 1. discrete transition
        let from = autopilot.mode();
        if autopilot.advance_discrete_mode(t, &x) {
            let to = autopilot.mode();
            debug!(autopilot = autopilot.name(), time = t, %from, %to, "mode transition");
            transitions.push(ModeTransition { time: t, step: i, from, to, state: x });

            if let Some(cap) = config.max_transitions {
                if transitions.len() > cap {
                    warn!(
                        autopilot = autopilot.name(),
                        time = t,
                        cap,
                        "transition cap exceeded, halting run"
                    );
                    status = RunStatus::TransitionLimit;
                    break;
                }
            }
        }

        // 2. reference command on the possibly updated mode
        let reference = autopilot.reference_command(t, &x);

        // 3-4. LLC -> plant -> integrator, last step clipped to the budget
        let t_next = config.step_end(i);
        let f = |tt: f64, xx: &AircraftState| {
            let u = llc.actuate(xx, &reference);
            plant.derivative(tt, xx, &u)
        };
        match integrator.step(&f, t, &x, t_next - t) {
            Ok(next) => x = next,
            Err(e) => {
                warn!(
                    autopilot = autopilot.name(),
                    time = t,
                    error = %e,
                    "integration failed, returning partial trajectory"
                );
                status = RunStatus::IntegrationFailed;
                failure = Some(e);
                break;
            }
        }

        // 5. log
        samples.push(TrajectorySample {
            time: t_next,
            state: x,
            mode: autopilot.mode(),
            extended: extended.then(|| diagnostics(plant, llc, t_next, &x, &reference)),
        });
    }

    if status == RunStatus::TimeExhausted {
        if let Some(last) = samples.last() {
            if autopilot.is_finished(last.time, &last.state) {
                status = RunStatus::Completed;
            }
        }
    }

    let runtime = started.elapsed();
    info!(
        autopilot = autopilot.name(),
        plant = plant.name(),
        controller = llc.name(),
        ?status,
        samples = samples.len(),
        transitions = transitions.len(),
        runtime_ms = runtime.as_secs_f64() * 1e3,
        "simulation finished"
    );

    Ok(SimulationResult {
        samples,
        transitions,
        status,
        runtime,
        failure,
    })
}

/// Simulate against the reduced-order testbed airframe with the default
/// rate-tracking controller (convenience wrapper).
pub fn simulate<A>(
    initial: &AircraftState,
    config: &SimConfig,
    autopilot: &mut A,
) -> Result<SimulationResult<A::Mode>, SimError>
where
    A: Autopilot + ?Sized,
{
    let plant = PointMassAircraft::default();
    let llc = RateTrackingController::new();
    simulate_with(initial, config, autopilot, &plant, &llc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
