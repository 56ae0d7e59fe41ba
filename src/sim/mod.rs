pub mod campaign;
pub mod event;
pub mod integrator;
pub mod runner;

pub use campaign::{Campaign, CampaignSummary, CaseOutcome, CaseReport, SpeedAltitudeGrid};
pub use event::ModeTransition;
pub use integrator::{Integrator, IntegratorKind};
pub use runner::{
    simulate, simulate_with, OutputMode, RunStatus, SimConfig, SimulationResult, TrajectorySample,
};
