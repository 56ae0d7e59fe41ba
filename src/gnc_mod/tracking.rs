use crate::autopilot::ReferenceCommand;
use crate::dynamics::state::{ActuatorDeflections, AircraftState, G};
use super::limits::ActuatorLimits;

// ---------------------------------------------------------------------------
// Rate-tracking inner loop: reference set-points -> surface deflections
// ---------------------------------------------------------------------------

/// Proportional rate tracker for the testbed airframe.
///
/// * pitch: load factor set-point converted to a pitch-rate demand
///   `q_ref = g * nz / vt`
/// * roll: stability-axis roll rate
/// * yaw: coordinated-turn yaw rate plus the `ny_r` offset
#[derive(Debug, Clone)]
pub struct RateTrackingController {
    pub k_q: f64, // deg elevator per rad/s pitch-rate error
    pub k_p: f64, // deg aileron per rad/s roll-rate error
    pub k_r: f64, // deg rudder per rad/s yaw-rate error
    pub throttle_trim: f64,
    pub limits: ActuatorLimits,
}

impl RateTrackingController {
    pub fn new() -> Self {
        Self {
            // Tuned for PointMassAircraft defaults (~90 % steady tracking)
            k_q: 50.0,
            k_p: 30.0,
            k_r: 20.0,
            throttle_trim: 0.3,
            limits: ActuatorLimits::default(),
        }
    }
}

impl Default for RateTrackingController {
    fn default() -> Self {
        Self::new()
    }
}

impl super::LowLevelController for RateTrackingController {
    fn actuate(&self, x: &AircraftState, reference: &ReferenceCommand) -> ActuatorDeflections {
        let vt = x.vt().max(1.0);

        let q_ref = G * reference.nz / vt;
        let elevator = self.k_q * (q_ref - x.q());

        let aileron = self.k_p * (reference.ps - x.stability_roll_rate());

        let r_ref = G * x.phi().sin() * x.theta().cos() / vt + reference.ny_r;
        let rudder = self.k_r * (r_ref - x.r());

        let raw = ActuatorDeflections {
            throttle: self.throttle_trim + reference.throttle,
            elevator,
            aileron,
            rudder,
        };
        self.limits.clamp(&raw)
    }

    fn limits(&self) -> ActuatorLimits {
        self.limits
    }

    fn name(&self) -> &str {
        "RateTrackingController"
    }
}
