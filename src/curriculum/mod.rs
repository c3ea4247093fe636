//! Level-k curriculum core
//!
//! This module holds the pieces that decide who plays whom:
//! - `RoleLayout`: fixed roster index arithmetic for a role and max level
//! - `roster`: one trainer per level/role slot
//! - `sampler`: categorical opponent-level sampling
//! - `matching`: ordering the selected pair for the environment
//! - `evaluation`: periodic freeze-and-measure state machine
//! - `ledger`: per-episode reward accounting
//! - `context`: the mutable run state owned by the training loop

pub mod context;
pub mod evaluation;
pub mod layout;
pub mod ledger;
pub mod matching;
pub mod roster;
pub mod sampler;

pub use context::TrainingContext;
pub use evaluation::{
    BoundaryOutcome, EvaluationConfig, EvaluationEvent, EvaluationPhase, EvaluationReport,
    EvaluationScheduler,
};
pub use layout::RoleLayout;
pub use ledger::EpisodeRewardLedger;
pub use matching::MatchPair;
pub use roster::{TrainerRoster, build_roster};
pub use sampler::{OpponentDistribution, OpponentSample, OpponentSampler};
