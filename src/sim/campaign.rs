use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::autopilot::{AesAutopilot, AesMode, AutopilotConfig, GcasAutopilot, GcasMode};
use crate::dynamics::point_mass::PointMassAircraft;
use crate::dynamics::state::{idx, AircraftState};
use crate::error::{ConfigError, SimError};
use crate::gnc::{LowLevelController, RateTrackingController};
use crate::scenario::Scenario;
use crate::verify::{SafetyBounds, SafetyVerifier, Violation};
use super::runner::{simulate_with, RunStatus, SimConfig};

// ---------------------------------------------------------------------------
// Per-case outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    /// GCAS kept the whole run inside the recovery envelope.
    Recovered,
    /// GCAS failed; AES completed and kept terrain clearance.
    Ejected,
    /// Neither autopilot produced a safe trajectory.
    Lost,
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseOutcome::Recovered => write!(f, "recovered"),
            CaseOutcome::Ejected => write!(f, "ejected"),
            CaseOutcome::Lost => write!(f, "lost"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub initial: AircraftState,
    pub outcome: CaseOutcome,
    pub gcas_status: RunStatus,
    /// First recovery-envelope breach of the GCAS run, if any.
    pub gcas_violation: Option<Violation>,
    /// `None` when the AES fallback was not needed.
    pub aes_status: Option<RunStatus>,
    pub aes_violation: Option<Violation>,
}

// ---------------------------------------------------------------------------
// GCAS -> AES campaign
// ---------------------------------------------------------------------------

/// Runs GCAS on each case and falls back to AES where recovery fails.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub sim: SimConfig,
    pub gcas: AutopilotConfig,
    pub gcas_init: GcasMode,
    pub aes: AutopilotConfig,
    pub aes_init: AesMode,
    pub recovery_bounds: SafetyBounds,
    pub ejection_bounds: SafetyBounds,
    pub plant: PointMassAircraft,
    pub llc: RateTrackingController,
}

impl Default for Campaign {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            gcas: AutopilotConfig::default(),
            gcas_init: GcasMode::Standby,
            aes: AutopilotConfig::default(),
            aes_init: AesMode::Waiting,
            recovery_bounds: SafetyBounds::recovery_envelope(),
            ejection_bounds: SafetyBounds::ejection_envelope(),
            plant: PointMassAircraft::default(),
            llc: RateTrackingController::new(),
        }
    }
}

impl Campaign {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            sim: scenario.sim.clone(),
            gcas: scenario.gcas.clone(),
            aes: scenario.aes.clone(),
            recovery_bounds: scenario.recovery_bounds.clone(),
            ejection_bounds: scenario.ejection_bounds.clone(),
            ..Default::default()
        }
    }

    /// Check every config up front so a sweep never fails halfway.
    pub fn validate(&self) -> Result<(), SimError> {
        self.sim.validate()?;
        self.gcas.validate()?;
        self.aes.validate()?;
        Ok(())
    }

    pub fn evaluate(&self, initial: &AircraftState) -> Result<CaseReport, SimError> {
        let limits = self.llc.limits();

        let mut gcas = GcasAutopilot::new(self.gcas_init, self.gcas.clone())?;
        let res = simulate_with(initial, &self.sim, &mut gcas, &self.plant, &self.llc)?;
        let recovery =
            SafetyVerifier::new(self.recovery_bounds.clone()).with_actuator_limits(limits);
        let gcas_violation = recovery.first_violation(&res);

        if res.status.is_complete() && gcas_violation.is_none() {
            return Ok(CaseReport {
                initial: *initial,
                outcome: CaseOutcome::Recovered,
                gcas_status: res.status,
                gcas_violation,
                aes_status: None,
                aes_violation: None,
            });
        }
        debug!(
            alt = initial.alt(),
            vt = initial.vt(),
            ?gcas_violation,
            "gcas failed, falling back to aes"
        );

        let mut aes = AesAutopilot::new(self.aes_init, self.aes.clone())?;
        let fallback = simulate_with(initial, &self.sim, &mut aes, &self.plant, &self.llc)?;
        let ejection =
            SafetyVerifier::new(self.ejection_bounds.clone()).with_actuator_limits(limits);
        let aes_violation = ejection.first_violation(&fallback);

        let outcome = if fallback.status.is_complete() && aes_violation.is_none() {
            CaseOutcome::Ejected
        } else {
            CaseOutcome::Lost
        };

        Ok(CaseReport {
            initial: *initial,
            outcome,
            gcas_status: res.status,
            gcas_violation,
            aes_status: Some(fallback.status),
            aes_violation,
        })
    }

    /// Evaluate all cases on the rayon pool. Report order matches `cases`.
    pub fn sweep(&self, cases: &[AircraftState]) -> Result<Vec<CaseReport>, SimError> {
        self.validate()?;
        let reports = cases
            .par_iter()
            .map(|x| self.evaluate(x))
            .collect::<Result<Vec<_>, _>>()?;

        let summary = CampaignSummary::from_reports(&reports);
        info!(
            cases = summary.cases,
            recovered = summary.recovered,
            ejected = summary.ejected,
            lost = summary.lost,
            "campaign finished"
        );
        Ok(reports)
    }
}

// ---------------------------------------------------------------------------
// Initial condition sampling
// ---------------------------------------------------------------------------

/// Uniform draws of airspeed and altitude around a template state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedAltitudeGrid {
    pub speed: (f64, f64),    // ft/s, half-open
    pub altitude: (f64, f64), // ft, half-open
    pub samples: usize,
    pub seed: u64,
}

impl SpeedAltitudeGrid {
    const SPEED_BANDS: [(&'static str, (f64, f64)); 3] =
        [("low", (300.0, 800.0)), ("medium", (800.0, 1500.0)), ("high", (1500.0, 2000.0))];
    const ALTITUDE_BANDS: [(&'static str, (f64, f64)); 3] =
        [("low", (500.0, 1000.0)), ("medium", (1000.0, 30_000.0)), ("high", (30_000.0, 45_000.0))];

    pub fn new(
        speed: (f64, f64),
        altitude: (f64, f64),
        samples: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        for (name, (lo, hi)) in [("speed", speed), ("altitude", altitude)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(ConfigError::InvalidBound {
                    quantity: name.to_string(),
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { speed, altitude, samples, seed })
    }

    /// The nine speed x altitude bands of the GCAS/AES survivability study.
    pub fn study_bands(samples: usize, seed: u64) -> Vec<(String, SpeedAltitudeGrid)> {
        let mut out = Vec::with_capacity(9);
        for (s_name, speed) in Self::SPEED_BANDS {
            for (a_name, altitude) in Self::ALTITUDE_BANDS {
                out.push((
                    format!("{s_name}-speed/{a_name}-alt"),
                    SpeedAltitudeGrid { speed, altitude, samples, seed },
                ));
            }
        }
        out
    }

    /// Same seed, same cases.
    pub fn cases(&self, template: &AircraftState) -> Vec<AircraftState> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..self.samples)
            .map(|_| {
                let alt = rng.gen_range(self.altitude.0..self.altitude.1);
                let vt = rng.gen_range(self.speed.0..self.speed.1);
                template.with(idx::ALT, alt).with(idx::VT, vt)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub cases: usize,
    pub recovered: usize,
    pub ejected: usize,
    pub lost: usize,
}

impl CampaignSummary {
    pub fn from_reports(reports: &[CaseReport]) -> Self {
        let mut s = Self::default();
        for r in reports {
            s.cases += 1;
            match r.outcome {
                CaseOutcome::Recovered => s.recovered += 1,
                CaseOutcome::Ejected => s.ejected += 1,
                CaseOutcome::Lost => s.lost += 1,
            }
        }
        s
    }

    /// Fraction of cases where the crew survived (recovered or ejected).
    pub fn survival_rate(&self) -> f64 {
        if self.cases == 0 {
            return 0.0;
        }
        (self.recovered + self.ejected) as f64 / self.cases as f64
    }
}

impl fmt::Display for CampaignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} cases  {:>4} recovered  {:>4} ejected  {:>4} lost  ({:.1}% survival)",
            self.cases,
            self.recovered,
            self.ejected,
            self.lost,
            self.survival_rate() * 100.0
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
