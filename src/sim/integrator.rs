use serde::{Deserialize, Serialize};

use crate::dynamics::state::{AircraftState, Deriv};
use crate::error::{ConfigError, IntegrationError};

// ---------------------------------------------------------------------------
// Integrator seam: advance x over [t, t + dt] once per discrete step
// ---------------------------------------------------------------------------

/// Advances the continuous state by one discrete step.
///
/// `f` is the closed-loop derivative with the autopilot reference held
/// constant over the step.
pub trait Integrator {
    fn step(
        &mut self,
        f: &dyn Fn(f64, &AircraftState) -> Deriv,
        t: f64,
        x: &AircraftState,
        dt: f64,
    ) -> Result<AircraftState, IntegrationError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorKind {
    Rk4,
    #[default]
    Rk45,
}

impl IntegratorKind {
    pub fn build(self) -> Box<dyn Integrator> {
        match self {
            IntegratorKind::Rk4 => Box::new(Rk4),
            IntegratorKind::Rk45 => Box::new(Rk45::default()),
        }
    }
}

fn checked(d: Deriv, t: f64) -> Result<Deriv, IntegrationError> {
    if d.is_finite() {
        Ok(d)
    } else {
        Err(IntegrationError::NonFiniteDerivative { time: t })
    }
}

// ---------------------------------------------------------------------------
// Classical 4th-order Runge-Kutta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn step(
        &mut self,
        f: &dyn Fn(f64, &AircraftState) -> Deriv,
        t: f64,
        x: &AircraftState,
        dt: f64,
    ) -> Result<AircraftState, IntegrationError> {
        let k1 = checked(f(t, x), t)?;
        let k2 = checked(f(t + dt * 0.5, &x.apply(&k1, dt * 0.5)), t)?;
        let k3 = checked(f(t + dt * 0.5, &x.apply(&k2, dt * 0.5)), t)?;
        let k4 = checked(f(t + dt, &x.apply(&k3, dt)), t)?;

        let next = AircraftState::from_vector(
            x.as_vector() + (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0) * (dt / 6.0),
        );
        if next.is_finite() {
            Ok(next)
        } else {
            Err(IntegrationError::NonFiniteState { time: t + dt })
        }
    }
}

// ---------------------------------------------------------------------------
// Dormand-Prince 5(4) with adaptive sub-stepping
// ---------------------------------------------------------------------------

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
// 5th-order weights (also row 7 of the tableau, FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// 5th minus 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Error scale floor; keeps the ratio finite when both tolerances are zero.
const MIN_SCALE: f64 = 1e-300;

/// Adaptive Dormand-Prince integrator. Sub-steps inside each discrete step
/// until the embedded error estimate meets `atol + rtol * |x|`.
#[derive(Debug, Clone)]
pub struct Rk45 {
    pub atol: f64,
    pub rtol: f64,
    pub min_step: f64,
    pub max_substeps: usize,
    /// Sub-step carried over between calls.
    h_guess: Option<f64>,
}

impl Default for Rk45 {
    fn default() -> Self {
        Self {
            atol: 1e-6,
            rtol: 1e-6,
            min_step: 1e-9,
            max_substeps: 10_000,
            h_guess: None,
        }
    }
}

impl Rk45 {
    pub fn new(atol: f64, rtol: f64) -> Result<Self, ConfigError> {
        if !(atol.is_finite() && atol > 0.0) {
            return Err(ConfigError::invalid("atol", format!("must be positive, got {atol}")));
        }
        if !(rtol.is_finite() && rtol >= 0.0) {
            return Err(ConfigError::invalid("rtol", format!("must be >= 0, got {rtol}")));
        }
        Ok(Self {
            atol,
            rtol,
            ..Default::default()
        })
    }

    /// One trial sub-step; returns the 5th-order solution and the RMS error
    /// ratio against tolerance (<= 1 means accept).
    fn trial(
        &self,
        f: &dyn Fn(f64, &AircraftState) -> Deriv,
        t: f64,
        x: &AircraftState,
        k1: &Deriv,
        h: f64,
    ) -> Result<(AircraftState, Deriv, f64), IntegrationError> {
        let y = x.as_vector();
        let k1 = k1.0;
        let k2 = checked(f(t + h / 5.0, &AircraftState::from_vector(y + h * A21 * k1)), t)?.0;
        let k3 = checked(
            f(t + 3.0 * h / 10.0, &AircraftState::from_vector(y + h * (A31 * k1 + A32 * k2))),
            t,
        )?
        .0;
        let k4 = checked(
            f(
                t + 4.0 * h / 5.0,
                &AircraftState::from_vector(y + h * (A41 * k1 + A42 * k2 + A43 * k3)),
            ),
            t,
        )?
        .0;
        let k5 = checked(
            f(
                t + 8.0 * h / 9.0,
                &AircraftState::from_vector(y + h * (A51 * k1 + A52 * k2 + A53 * k3 + A54 * k4)),
            ),
            t,
        )?
        .0;
        let k6 = checked(
            f(
                t + h,
                &AircraftState::from_vector(
                    y + h * (A61 * k1 + A62 * k2 + A63 * k3 + A64 * k4 + A65 * k5),
                ),
            ),
            t,
        )?
        .0;

        let y_new = y + h * (B1 * k1 + B3 * k3 + B4 * k4 + B5 * k5 + B6 * k6);
        let x_new = AircraftState::from_vector(y_new);
        if !x_new.is_finite() {
            return Err(IntegrationError::NonFiniteState { time: t + h });
        }
        let k7 = checked(f(t + h, &x_new), t)?;

        let err = h * (E1 * k1 + E3 * k3 + E4 * k4 + E5 * k5 + E6 * k6 + E7 * k7.0);
        let mut sum = 0.0;
        for i in 0..err.len() {
            let scale = (self.atol + self.rtol * y[i].abs().max(y_new[i].abs())).max(MIN_SCALE);
            sum += (err[i] / scale).powi(2);
        }
        let ratio = (sum / err.len() as f64).sqrt();
        Ok((x_new, k7, ratio))
    }
}

impl Integrator for Rk45 {
    fn step(
        &mut self,
        f: &dyn Fn(f64, &AircraftState) -> Deriv,
        t: f64,
        x: &AircraftState,
        dt: f64,
    ) -> Result<AircraftState, IntegrationError> {
        let t_end = t + dt;
        let mut t_cur = t;
        let mut x_cur = *x;
        let mut h = self.h_guess.unwrap_or(dt).min(dt);
        let mut k1 = checked(f(t_cur, &x_cur), t_cur)?;

        for _ in 0..self.max_substeps {
            let remaining = t_end - t_cur;
            if remaining <= 1e-12 * dt.max(1.0) {
                return Ok(x_cur);
            }
            let last = h >= remaining;
            let h_try = if last { remaining } else { h };

            let (x_new, k_end, ratio) = self.trial(f, t_cur, &x_cur, &k1, h_try)?;
            if ratio.is_nan() {
                return Err(IntegrationError::NonFiniteState { time: t_cur + h_try });
            }

            // standard controller, safety 0.9, growth clamped to [0.2, 5]
            let factor = if ratio == 0.0 {
                5.0
            } else {
                (0.9 * ratio.powf(-0.2)).clamp(0.2, 5.0)
            };

            if ratio <= 1.0 {
                t_cur = if last { t_end } else { t_cur + h_try };
                x_cur = x_new;
                k1 = k_end;
                if !last {
                    self.h_guess = Some(h_try * factor);
                }
                h = h_try * factor;
            } else {
                h = h_try * factor;
                if h < self.min_step {
                    return Err(IntegrationError::StepSizeUnderflow { time: t_cur, step: h });
                }
            }
        }

        if t_end - t_cur <= 1e-12 * dt.max(1.0) {
            Ok(x_cur)
        } else {
            Err(IntegrationError::TooManySubsteps {
                limit: self.max_substeps,
                target: t_end,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
