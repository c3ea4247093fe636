//! Ports (trait boundaries) for external collaborators.
//!
//! The curriculum core only talks to environments, trainers, checkpoint storage
//! and observers through these traits. Concrete implementations live in
//! `env`, `trainers`, `adapters` and `pipeline::observers`.

pub mod environment;
pub mod observer;
pub mod repository;
pub mod trainer;

pub use environment::{Environment, Step};
pub use observer::Observer;
pub use repository::CheckpointRepository;
pub use trainer::{Trainer, TrainerFactory, TrainerSpec};
