use nalgebra::SVector;

use crate::dynamics::plant::Plant;
use crate::dynamics::state::{idx, ActuatorDeflections, AircraftState, Deriv, G, NUM_STATES};

/// Smallest airspeed used as a divisor, ft/s.
const MIN_VT: f64 = 1.0;
/// Smallest |cos(theta)| used as a divisor near vertical attitudes.
const MIN_COS_THETA: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Reduced-order fighter testbed
// ---------------------------------------------------------------------------

/// Point-mass airframe with first-order rate responses on each axis.
///
/// Stands in for a full nonlinear 6DOF model so the supervisory layer can be
/// run closed-loop. Units: feet, seconds, radians (control surfaces in deg).
#[derive(Debug, Clone)]
pub struct PointMassAircraft {
    pub lift_slope: f64,       // nz per (rad * (ft/s)^2)
    pub drag_coeff: f64,       // parasitic drag, (ft/s^2) per (ft/s)^2
    pub max_thrust_accel: f64, // ft/s^2 at 100 % power
    pub engine_lag: f64,       // s, power lag time constant
    pub pitch_control: f64,    // rad/s^2 per deg elevator
    pub pitch_damping: f64,    // 1/s (negative = stable)
    pub roll_control: f64,     // rad/s^2 per deg aileron
    pub roll_damping: f64,     // 1/s
    pub yaw_control: f64,      // rad/s^2 per deg rudder
    pub yaw_damping: f64,      // 1/s
    pub side_damping: f64,     // 1/s, sideslip decay
}

impl Default for PointMassAircraft {
    fn default() -> Self {
        Self {
            lift_slope: 5.0e-5,
            drag_coeff: 1.4e-5,
            max_thrust_accel: 32.0,
            engine_lag: 1.0,
            pitch_control: 0.3,
            pitch_damping: -2.0,
            roll_control: 0.6,
            roll_damping: -1.0,
            yaw_control: 0.2,
            yaw_damping: -1.0,
            side_damping: -0.5,
        }
    }
}

impl PointMassAircraft {
    /// Lift load factor produced at the current angle of attack and speed.
    pub fn lift_load_factor(&self, x: &AircraftState) -> f64 {
        self.lift_slope * x.alpha() * x.vt() * x.vt()
    }

    fn lateral_load_factor(&self, x: &AircraftState) -> f64 {
        x.vt() * self.side_damping * x.beta() / G
    }
}

impl Plant for PointMassAircraft {
    fn derivative(&self, _t: f64, x: &AircraftState, u: &ActuatorDeflections) -> Deriv {
        let vt = x.vt().max(MIN_VT);
        let (sin_phi, cos_phi) = x.phi().sin_cos();
        let (sin_theta, cos_theta_raw) = x.theta().sin_cos();
        let cos_theta = if cos_theta_raw.abs() < MIN_COS_THETA {
            MIN_COS_THETA.copysign(cos_theta_raw)
        } else {
            cos_theta_raw
        };

        let sin_gamma = x.sin_gamma().clamp(-1.0, 1.0);
        let cos_gamma = (1.0 - sin_gamma * sin_gamma).sqrt();
        let (sin_psi, cos_psi) = x.psi().sin_cos();

        // --- Translational (wind axes) ---
        let thrust = self.max_thrust_accel * x.power() / 100.0;
        let drag = self.drag_coeff * x.vt() * x.vt();
        let vt_dot = thrust - drag - G * sin_gamma;

        let nz = self.lift_load_factor(x);
        let alpha_dot = x.q() - G * (nz - cos_gamma * cos_phi) / vt;

        let coordinated_r = G * sin_phi * cos_theta / vt;
        let beta_dot = self.side_damping * x.beta() - (x.r() - coordinated_r);

        // --- Euler kinematics ---
        let qr = x.q() * sin_phi + x.r() * cos_phi;
        let phi_dot = x.p() + sin_theta / cos_theta * qr;
        let theta_dot = x.q() * cos_phi - x.r() * sin_phi;
        let psi_dot = qr / cos_theta;

        // --- Body rates (first-order responses) ---
        let p_dot = self.roll_control * u.aileron + self.roll_damping * x.p();
        let q_dot = self.pitch_control * u.elevator + self.pitch_damping * x.q();
        let r_dot = self.yaw_control * u.rudder + self.yaw_damping * x.r();

        // --- Navigation ---
        let north_dot = x.vt() * cos_gamma * cos_psi;
        let east_dot = x.vt() * cos_gamma * sin_psi;
        let alt_dot = x.vt() * sin_gamma;

        // --- Engine power lag ---
        let pow_dot = (u.throttle.clamp(0.0, 1.0) * 100.0 - x.power()) / self.engine_lag;

        let mut d = SVector::<f64, NUM_STATES>::zeros();
        d[idx::VT] = vt_dot;
        d[idx::ALPHA] = alpha_dot;
        d[idx::BETA] = beta_dot;
        d[idx::PHI] = phi_dot;
        d[idx::THETA] = theta_dot;
        d[idx::PSI] = psi_dot;
        d[idx::P] = p_dot;
        d[idx::Q] = q_dot;
        d[idx::R] = r_dot;
        d[idx::POS_N] = north_dot;
        d[idx::POS_E] = east_dot;
        d[idx::ALT] = alt_dot;
        d[idx::POW] = pow_dot;
        Deriv(d)
    }

    fn load_factors(
        &self,
        _t: f64,
        x: &AircraftState,
        _u: &ActuatorDeflections,
        _xd: &Deriv,
    ) -> (f64, f64) {
        (self.lift_load_factor(x), self.lateral_load_factor(x))
    }

    fn name(&self) -> &str {
        "PointMassAircraft"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trimmed_level(plant: &PointMassAircraft, vt: f64) -> AircraftState {
        let alpha = 1.0 / (plant.lift_slope * vt * vt);
        AircraftState::from_array([
            vt, alpha, 0.0, 0.0, alpha, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10_000.0, 50.0,
        ])
    }

    #[test]
    fn trimmed_level_holds_altitude_and_alpha() {
        let plant = PointMassAircraft::default();
        let x = trimmed_level(&plant, 600.0);
        let u = ActuatorDeflections { throttle: 0.5, ..Default::default() };
        let d = plant.derivative(0.0, &x, &u);
        assert!(d.get(idx::ALT).abs() < 1e-9, "h_dot = {}", d.get(idx::ALT));
        assert!(d.get(idx::ALPHA).abs() < 1e-9, "alpha_dot = {}", d.get(idx::ALPHA));
        assert_relative_eq!(d.get(idx::POS_N), 600.0, epsilon = 1e-6);
    }

    #[test]
    fn dive_loses_altitude_and_gains_speed() {
        let plant = PointMassAircraft::default();
        let x = trimmed_level(&plant, 400.0).with(idx::THETA, -1.0);
        let d = plant.derivative(0.0, &x, &ActuatorDeflections::default());
        assert!(d.get(idx::ALT) < 0.0);
        assert!(d.get(idx::VT) > 0.0, "gravity should accelerate a slow steep dive");
    }

    #[test]
    fn engine_lag_tracks_throttle() {
        let plant = PointMassAircraft::default();
        let x = trimmed_level(&plant, 600.0);
        let full = ActuatorDeflections { throttle: 1.0, ..Default::default() };
        let idle = ActuatorDeflections { throttle: 0.0, ..Default::default() };
        assert!(plant.derivative(0.0, &x, &full).get(idx::POW) > 0.0);
        assert!(plant.derivative(0.0, &x, &idle).get(idx::POW) < 0.0);
    }

    #[test]
    fn aileron_drives_roll_acceleration() {
        let plant = PointMassAircraft::default();
        let x = trimmed_level(&plant, 600.0);
        let u = ActuatorDeflections { aileron: 10.0, ..Default::default() };
        assert_relative_eq!(plant.derivative(0.0, &x, &u).get(idx::P), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn vertical_attitude_stays_finite() {
        let plant = PointMassAircraft::default();
        let x = trimmed_level(&plant, 600.0)
            .with(idx::THETA, std::f64::consts::FRAC_PI_2)
            .with(idx::Q, 0.2);
        assert!(plant.derivative(0.0, &x, &ActuatorDeflections::default()).is_finite());
    }
}
