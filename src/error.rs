use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration / precondition errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown {autopilot} mode: '{name}'")]
    UnknownMode { autopilot: &'static str, name: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid bound for {quantity}: lower {lower} > upper {upper}")]
    InvalidBound {
        quantity: String,
        lower: f64,
        upper: f64,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation driver errors (raised before any step is taken)
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Step size must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("Time budget must be positive and finite, got {0}")]
    InvalidTimeBudget(f64),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Numerical failures inside one integration step
// ---------------------------------------------------------------------------

/// Reported by an [`Integrator`](crate::sim::integrator::Integrator).
/// The driver turns these into `RunStatus::IntegrationFailed`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum IntegrationError {
    #[error("Non-finite derivative at t={time}")]
    NonFiniteDerivative { time: f64 },

    #[error("Non-finite state at t={time}")]
    NonFiniteState { time: f64 },

    #[error("Step size underflow at t={time} (h={step:e})")]
    StepSizeUnderflow { time: f64, step: f64 },

    #[error("Exceeded {limit} sub-steps before reaching t={target}")]
    TooManySubsteps { limit: usize, target: f64 },
}
