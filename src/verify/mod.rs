//! Post-hoc safety verification of a finished trajectory.

pub mod bounds;
pub mod verifier;

pub use bounds::{Bound, BoundEdge, Quantity, SafetyBounds};
pub use verifier::{SafetyVerifier, Violation};
