//! Observer port - abstraction for training observation and data collection
//!
//! Observers see the run through a fixed set of events and never influence
//! curriculum decisions.

use crate::{
    Result,
    curriculum::{EpisodeRewardLedger, EvaluationReport, OpponentDistribution},
    pipeline::RunSummary,
    types::UpdateLoss,
};

/// Observer trait for monitoring a level-k run
///
/// # Event Sequence
///
/// 1. `on_run_start(total_episodes)` - once
/// 2. Repeated while the loop runs:
///    - `on_update(...)` - after each update that produced a loss
///    - `on_episode_end(...)` - at each episode boundary
///    - `on_evaluation_started(...)` / `on_evaluation_completed(...)`
///    - `on_checkpoint(...)` - after each save
/// 3. `on_run_end(summary)` - once
///
/// # Examples
///
/// ```no_run
/// use levelk::{curriculum::EpisodeRewardLedger, ports::Observer};
///
/// struct EpisodeCounter {
///     episodes: usize,
/// }
///
/// impl Observer for EpisodeCounter {
///     fn on_episode_end(
///         &mut self,
///         _episode: usize,
///         _ledger: &EpisodeRewardLedger,
///     ) -> levelk::Result<()> {
///         self.episodes += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called once before the first step.
    fn on_run_start(&mut self, _total_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called at every episode boundary, after the ledger opened the next episode.
    ///
    /// `episode` is the number of completed episodes in this run.
    fn on_episode_end(&mut self, _episode: usize, _ledger: &EpisodeRewardLedger) -> Result<()> {
        Ok(())
    }

    /// Called when the super agent is frozen for evaluation.
    fn on_evaluation_started(&mut self, _episode: usize, _scheduled: usize) -> Result<()> {
        Ok(())
    }

    /// Called when an evaluation cycle has picked its worst level.
    fn on_evaluation_completed(
        &mut self,
        _report: &EvaluationReport,
        _distribution: &OpponentDistribution,
    ) -> Result<()> {
        Ok(())
    }

    /// Called after a trainer update that returned a loss.
    fn on_update(&mut self, _trainer_index: usize, _step: u64, _loss: &UpdateLoss) -> Result<()> {
        Ok(())
    }

    /// Called after a checkpoint and the training curves were written.
    fn on_checkpoint(
        &mut self,
        _episode: usize,
        _ledger: &EpisodeRewardLedger,
        _distribution: &OpponentDistribution,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once when the loop exits normally.
    fn on_run_end(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}
