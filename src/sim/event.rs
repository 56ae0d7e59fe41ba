use std::fmt;

use serde::Serialize;

use crate::dynamics::state::AircraftState;

// ---------------------------------------------------------------------------
// Discrete mode transitions
// ---------------------------------------------------------------------------

/// A mode change taken by the autopilot during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeTransition<M> {
    pub time: f64,
    pub step: usize,
    pub from: M,
    pub to: M,
    pub state: AircraftState,
}

impl<M: fmt::Display> fmt::Display for ModeTransition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>7.3}s  {} -> {}  (alt={:.0} ft, vt={:.0} ft/s)",
            self.time,
            self.from,
            self.to,
            self.state.alt(),
            self.state.vt()
        )
    }
}

/// Every mode entered, in order, starting from `initial`. A mode re-entered
/// later (AES eject -> roll -> ...) appears once per entry.
pub fn mode_sequence<M: Copy>(initial: M, transitions: &[ModeTransition<M>]) -> Vec<M> {
    let mut seq = vec![initial];
    seq.extend(transitions.iter().map(|tr| tr.to));
    seq
}
