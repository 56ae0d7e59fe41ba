pub mod controller;
pub mod limits;
pub mod tracking;

pub use controller::LowLevelController;
pub use limits::{ActuatorLimits, Range};
pub use tracking::RateTrackingController;
