use nalgebra::SVector;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G: f64 = 32.174; // standard gravity, ft/s^2
pub const NUM_STATES: usize = 13;

/// Named positions inside the aircraft state vector.
///
/// Every guard and command builder indexes through these; never by literal.
pub mod idx {
    pub const VT: usize = 0; // airspeed, ft/s
    pub const ALPHA: usize = 1; // angle of attack, rad
    pub const BETA: usize = 2; // sideslip, rad
    pub const PHI: usize = 3; // roll, rad
    pub const THETA: usize = 4; // pitch, rad
    pub const PSI: usize = 5; // yaw, rad
    pub const P: usize = 6; // roll rate, rad/s
    pub const Q: usize = 7; // pitch rate, rad/s
    pub const R: usize = 8; // yaw rate, rad/s
    pub const POS_N: usize = 9; // north position, ft
    pub const POS_E: usize = 10; // east position, ft
    pub const ALT: usize = 11; // altitude, ft
    pub const POW: usize = 12; // engine power lag state, percent
}

pub type StateVector = SVector<f64, NUM_STATES>;

// ---------------------------------------------------------------------------
// Aircraft state snapshot
// ---------------------------------------------------------------------------

/// Full continuous state at a single point in time.
///
/// Layout: `[vt, alpha, beta, phi, theta, psi, p, q, r, pn, pe, h, pow]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AircraftState(StateVector);

impl AircraftState {
    pub fn from_array(values: [f64; NUM_STATES]) -> Self {
        Self(StateVector::from(values))
    }

    pub fn from_vector(v: StateVector) -> Self {
        Self(v)
    }

    pub fn as_vector(&self) -> &StateVector {
        &self.0
    }

    pub fn get(&self, i: usize) -> f64 {
        self.0[i]
    }

    /// Copy with one component replaced.
    pub fn with(mut self, i: usize, value: f64) -> Self {
        self.0[i] = value;
        self
    }

    /// Euler step `x + d * dt`; used by the Runge-Kutta stages.
    pub fn apply(&self, d: &Deriv, dt: f64) -> AircraftState {
        AircraftState(self.0 + d.0 * dt)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    pub fn vt(&self) -> f64 {
        self.0[idx::VT]
    }

    pub fn alpha(&self) -> f64 {
        self.0[idx::ALPHA]
    }

    pub fn beta(&self) -> f64 {
        self.0[idx::BETA]
    }

    pub fn phi(&self) -> f64 {
        self.0[idx::PHI]
    }

    pub fn theta(&self) -> f64 {
        self.0[idx::THETA]
    }

    pub fn psi(&self) -> f64 {
        self.0[idx::PSI]
    }

    pub fn p(&self) -> f64 {
        self.0[idx::P]
    }

    pub fn q(&self) -> f64 {
        self.0[idx::Q]
    }

    pub fn r(&self) -> f64 {
        self.0[idx::R]
    }

    pub fn alt(&self) -> f64 {
        self.0[idx::ALT]
    }

    pub fn power(&self) -> f64 {
        self.0[idx::POW]
    }

    /// Stability-axis roll rate: `p cos(alpha) + r sin(alpha)`.
    pub fn stability_roll_rate(&self) -> f64 {
        self.p() * self.alpha().cos() + self.r() * self.alpha().sin()
    }

    /// Sine of the flight path angle, accounting for bank and sideslip.
    pub fn sin_gamma(&self) -> f64 {
        let (sa, ca) = self.alpha().sin_cos();
        let (sb, cb) = self.beta().sin_cos();
        let (sp, cp) = self.phi().sin_cos();
        let (st, ct) = self.theta().sin_cos();
        ca * cb * st - (sp * sb + cp * sa * cb) * ct
    }
}

impl From<[f64; NUM_STATES]> for AircraftState {
    fn from(values: [f64; NUM_STATES]) -> Self {
        Self::from_array(values)
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deriv(pub StateVector);

impl Deriv {
    pub fn get(&self, i: usize) -> f64 {
        self.0[i]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

// ---------------------------------------------------------------------------
// Actuator deflections (low-level controller output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorDeflections {
    pub throttle: f64, // 0..1
    pub elevator: f64, // deg, positive = nose up
    pub aileron: f64,  // deg, positive = right roll
    pub rudder: f64,   // deg, positive = nose right
}

// ---------------------------------------------------------------------------
// Derived quantities
// ---------------------------------------------------------------------------

/// Normal load factor (g) from kinematics alone.
///
/// `nz = vt * (q - alpha_dot) / g + cos(gamma) * cos(phi)`, a wind-axis
/// approximation that needs no aerodynamic model.
pub fn kinematic_load_factor(x: &AircraftState, alpha_dot: f64) -> f64 {
    let cos_gamma = x.sin_gamma().clamp(-1.0, 1.0).asin().cos();
    x.vt() * (x.q() - alpha_dot) / G + cos_gamma * x.phi().cos()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn level(vt: f64, alt: f64) -> AircraftState {
        AircraftState::from_array([vt, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, alt, 9.0])
    }

    #[test]
    fn named_indices_match_layout() {
        let x = AircraftState::from_array([
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0,
        ]);
        assert_eq!(x.vt(), 1.0);
        assert_eq!(x.phi(), 4.0);
        assert_eq!(x.p(), 7.0);
        assert_eq!(x.alt(), 12.0);
        assert_eq!(x.power(), 13.0);
    }

    #[test]
    fn level_flight_is_one_g() {
        let x = level(600.0, 5000.0);
        assert_relative_eq!(kinematic_load_factor(&x, 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn dive_has_negative_sin_gamma() {
        let x = level(600.0, 5000.0).with(idx::THETA, -0.5);
        assert!(x.sin_gamma() < 0.0);
    }

    #[test]
    fn state_serializes_as_flat_array() {
        let x = level(500.0, 1000.0);
        let json = serde_json::to_string(&x).unwrap();
        let back: AircraftState = serde_json::from_str(&json).unwrap();
        assert_eq!(x, back);
        assert!(json.starts_with('['));
    }
}
