pub mod autopilot;
pub mod dynamics;
pub mod error;
mod gnc_mod;
pub mod scenario;
pub mod sim;
pub mod verify;

// The gnc module: expose gnc_mod as `gnc` publicly
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use autopilot::{
    AesAutopilot, AesMode, Autopilot, AutopilotConfig, GcasAutopilot, GcasMode, ReferenceCommand,
};
pub use dynamics::state::AircraftState;
pub use error::{ConfigError, IntegrationError, SimError};
pub use scenario::Scenario;
pub use sim::{simulate, simulate_with, RunStatus, SimConfig, SimulationResult};
pub use verify::{SafetyBounds, SafetyVerifier, Violation};
