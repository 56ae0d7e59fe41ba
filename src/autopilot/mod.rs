//! Supervisory autopilots: hybrid automata over the continuous aircraft state.
//!
//! Each variant carries its own closed mode enumeration and guard set behind
//! the shared [`Autopilot`] contract. Guards and command builders are pure
//! functions of `(mode, t, x, config)`; the only mutation is the mode update
//! inside [`Autopilot::advance_discrete_mode`], called once per step by the
//! simulation driver.

pub mod aes;
pub mod command;
pub mod config;
pub mod gcas;
pub mod guards;

use std::fmt;

use crate::dynamics::state::AircraftState;

pub use aes::{AesAutopilot, AesMode};
pub use command::ReferenceCommand;
pub use config::AutopilotConfig;
pub use gcas::{GcasAutopilot, GcasMode};

/// Contract shared by every supervisory autopilot variant.
pub trait Autopilot {
    /// Closed enumeration of discrete modes.
    type Mode: Copy + PartialEq + fmt::Debug + fmt::Display + Send;

    fn mode(&self) -> Self::Mode;

    /// Evaluate the current mode's guard and take at most one transition.
    /// Returns whether the mode changed.
    fn advance_discrete_mode(&mut self, t: f64, x: &AircraftState) -> bool;

    /// Reference set-points for the low-level controller. Never mutates mode.
    fn reference_command(&self, t: f64, x: &AircraftState) -> ReferenceCommand;

    /// True once a terminal mode has been reached.
    fn is_finished(&self, t: f64, x: &AircraftState) -> bool;

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
