//! Training pipeline
//!
//! This module provides:
//! - Run configuration and mode selection
//! - The episode/step loop that drives the level-k curriculum
//! - Training-curve and benchmark artifacts
//! - Observer adapters (progress bar, loss CSV log, distribution log)

pub mod artifacts;
pub mod config;
pub mod observers;
pub mod training;

pub use artifacts::{BenchmarkRecorder, CurveArtifacts, TrainingCurves};
pub use config::{ArtifactPaths, DisplayTiming, RunMode, TrainingConfig, parse_previous_episodes};
pub use observers::{DistributionLogObserver, LossLogObserver, ProgressObserver};
pub use training::{LevelKPipeline, RunSummary};

pub use crate::ports::Observer;
