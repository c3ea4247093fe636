//! Level-k curriculum training for two-player multi-agent reinforcement learning
//!
//! This crate provides:
//! - A trainer roster holding one learning "super agent" and a frozen opponent per level
//! - Per-step opponent sampling from a mutable categorical distribution
//! - Periodic evaluation cycles that re-weight the distribution towards the
//!   opponent level the super agent handles worst
//! - The episode/step loop, checkpoints and training-curve artifacts
//! - A built-in 1v1 high-value-target environment and a linear actor-critic trainer

pub mod adapters;
pub mod cli;
pub mod curriculum;
pub mod env;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod roles;
pub mod trainers;
pub mod types;

pub use error::{Error, Result};
pub use roles::{Role, RoleTag};
