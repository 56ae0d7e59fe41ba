use serde::{Deserialize, Serialize};

use crate::dynamics::state::ActuatorDeflections;

// ---------------------------------------------------------------------------
// Actuator saturation table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }

    /// Distance from the centre of the range, 1.0 at either stop.
    pub fn excursion(&self, v: f64) -> f64 {
        let half = 0.5 * (self.max - self.min);
        if half <= 0.0 {
            return 0.0;
        }
        (v - 0.5 * (self.max + self.min)).abs() / half
    }
}

/// Per-actuator travel limits (throttle 0..1, surfaces in deg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorLimits {
    pub throttle: Range,
    pub elevator: Range,
    pub aileron: Range,
    pub rudder: Range,
}

impl Default for ActuatorLimits {
    fn default() -> Self {
        // F-16 class surface travel
        Self {
            throttle: Range::new(0.0, 1.0),
            elevator: Range::new(-25.0, 25.0),
            aileron: Range::new(-21.5, 21.5),
            rudder: Range::new(-30.0, 30.0),
        }
    }
}

impl ActuatorLimits {
    pub fn clamp(&self, u: &ActuatorDeflections) -> ActuatorDeflections {
        ActuatorDeflections {
            throttle: self.throttle.clamp(u.throttle),
            elevator: self.elevator.clamp(u.elevator),
            aileron: self.aileron.clamp(u.aileron),
            rudder: self.rudder.clamp(u.rudder),
        }
    }

    /// Largest normalized surface excursion across elevator, aileron and
    /// rudder. Throttle is excluded: idle is a normal operating point.
    pub fn saturation(&self, u: &ActuatorDeflections) -> f64 {
        self.elevator
            .excursion(u.elevator)
            .max(self.aileron.excursion(u.aileron))
            .max(self.rudder.excursion(u.rudder))
    }
}
