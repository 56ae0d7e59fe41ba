//! Continuous side of the loop: aircraft state layout, the plant interface,
//! and a reduced-order testbed airframe.

pub mod plant;
pub mod point_mass;
pub mod state;

pub use plant::Plant;
pub use point_mass::PointMassAircraft;
pub use state::{ActuatorDeflections, AircraftState, Deriv};
