//! Reference trainer implementations
//!
//! The curriculum works with any `Trainer`; this module provides a small
//! linear actor-critic so the crate runs end to end without an external
//! deep-learning backend.

pub mod factory;
pub mod linear;

pub use factory::{PolicyKind, StandardTrainerFactory};
pub use linear::{LinearActorCritic, LinearTrainerConfig};
