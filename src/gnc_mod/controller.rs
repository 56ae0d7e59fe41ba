use crate::autopilot::ReferenceCommand;
use crate::dynamics::state::{ActuatorDeflections, AircraftState};
use super::limits::ActuatorLimits;

/// Trait for low-level (inner-loop) flight controllers.
///
/// Maps an autopilot reference command onto actuator deflections. The
/// simulation driver calls `actuate` inside the derivative evaluation, so
/// implementations must be pure.
pub trait LowLevelController: Sync {
    /// Compute actuator deflections tracking `reference` from state `x`.
    fn actuate(&self, x: &AircraftState, reference: &ReferenceCommand) -> ActuatorDeflections;

    /// Saturation table of the actuators this controller drives.
    fn limits(&self) -> ActuatorLimits;

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
