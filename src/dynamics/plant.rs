use crate::dynamics::state::{kinematic_load_factor, idx, ActuatorDeflections, AircraftState, Deriv};

/// Continuous aircraft dynamics, `dx/dt = f(t, x, u)`.
///
/// Implementations must be deterministic and side-effect free; the
/// integrator calls `derivative` several times per step.
pub trait Plant: Sync {
    fn derivative(&self, t: f64, x: &AircraftState, u: &ActuatorDeflections) -> Deriv;

    /// Normal and lateral load factors (g) at a state.
    ///
    /// The default uses kinematics only and reports zero lateral load.
    fn load_factors(
        &self,
        _t: f64,
        x: &AircraftState,
        _u: &ActuatorDeflections,
        xd: &Deriv,
    ) -> (f64, f64) {
        (kinematic_load_factor(x, xd.get(idx::ALPHA)), 0.0)
    }

    fn name(&self) -> &str {
        "unnamed"
    }
}
