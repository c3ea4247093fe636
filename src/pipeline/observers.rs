//! Observer adapters for the level-k pipeline
//!
//! Observers allow composable data collection during training without coupling
//! the step loop to specific output formats.

use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::{
    Result,
    curriculum::{EpisodeRewardLedger, EvaluationReport, OpponentDistribution},
    error::Error,
    pipeline::RunSummary,
    ports::Observer,
    types::UpdateLoss,
};

/// Progress bar observer - shows completed episodes and the latest return
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    evaluating: bool,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            evaluating: false,
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_run_start(&mut self, total_episodes: usize) -> Result<()> {
        let pb = ProgressBar::new(total_episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_episode_end(&mut self, episode: usize, ledger: &EpisodeRewardLedger) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(episode as u64);
            let last = ledger
                .episode_rewards()
                .len()
                .checked_sub(2)
                .map(|i| ledger.episode_rewards()[i])
                .unwrap_or(0.0);
            let phase = if self.evaluating { "eval" } else { "train" };
            pb.set_message(format!("{phase} R:{last:.2}"));
        }
        Ok(())
    }

    fn on_evaluation_started(&mut self, _episode: usize, _scheduled: usize) -> Result<()> {
        self.evaluating = true;
        Ok(())
    }

    fn on_evaluation_completed(
        &mut self,
        _report: &EvaluationReport,
        _distribution: &OpponentDistribution,
    ) -> Result<()> {
        self.evaluating = false;
        Ok(())
    }

    fn on_run_end(&mut self, summary: &RunSummary) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!(
                "{} episodes, {} updates",
                summary.episodes, summary.updates
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct LossRow {
    p_loss: f64,
}

/// Loss log observer - appends the policy loss of each update to a CSV file
///
/// One file per tracked trainer index:
/// `{dir}/agent_{index}_loss_episodes_{episodes}.csv` with a single `p_loss` column.
pub struct LossLogObserver {
    writers: BTreeMap<usize, csv::Writer<File>>,
    paths: BTreeMap<usize, PathBuf>,
}

impl LossLogObserver {
    /// Open (appending) the loss files for `trainer_indices` and write their header.
    pub fn new(dir: &Path, episodes: usize, trainer_indices: &[usize]) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|source| Error::io(format!("create directory {dir:?}"), source))?;

        let mut writers = BTreeMap::new();
        let mut paths = BTreeMap::new();
        for &index in trainer_indices {
            let path = Self::file_path(dir, index, episodes);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| Error::io(format!("open loss log {path:?}"), source))?;
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.write_record(["p_loss"])?;
            writer.flush()?;
            writers.insert(index, writer);
            paths.insert(index, path);
        }
        Ok(Self { writers, paths })
    }

    pub fn file_path(dir: &Path, index: usize, episodes: usize) -> PathBuf {
        dir.join(format!("agent_{index}_loss_episodes_{episodes}.csv"))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().map(PathBuf::as_path)
    }
}

impl Observer for LossLogObserver {
    fn on_update(&mut self, trainer_index: usize, _step: u64, loss: &UpdateLoss) -> Result<()> {
        if let Some(writer) = self.writers.get_mut(&trainer_index) {
            writer.serialize(LossRow {
                p_loss: loss.p_loss,
            })?;
            writer.flush()?;
        }
        Ok(())
    }

    fn on_run_end(&mut self, _summary: &RunSummary) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Distribution log observer - narrates the opponent distribution through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct DistributionLogObserver;

impl DistributionLogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for DistributionLogObserver {
    fn on_checkpoint(
        &mut self,
        episode: usize,
        _ledger: &EpisodeRewardLedger,
        distribution: &OpponentDistribution,
    ) -> Result<()> {
        tracing::info!(
            episode,
            "Opponent selection probabilities: {:.3?}",
            distribution.probabilities()
        );
        Ok(())
    }

    fn on_evaluation_completed(
        &mut self,
        report: &EvaluationReport,
        distribution: &OpponentDistribution,
    ) -> Result<()> {
        tracing::info!(
            worst_level = report.worst_level,
            "Opponent weights after evaluation: {:?}",
            distribution.weights()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn loss(p_loss: f64) -> UpdateLoss {
        UpdateLoss {
            q_loss: 0.0,
            p_loss,
            mean_target_q: 0.0,
            mean_reward: 0.0,
        }
    }

    #[test]
    fn test_loss_log_writes_tracked_indices_only() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut observer =
            LossLogObserver::new(temp_dir.path(), 300, &[2]).expect("Failed to open loss log");

        observer.on_update(2, 100, &loss(0.5)).unwrap();
        observer.on_update(0, 100, &loss(9.0)).unwrap();
        observer.on_update(2, 200, &loss(-0.25)).unwrap();

        let path = LossLogObserver::file_path(temp_dir.path(), 2, 300);
        let content = std::fs::read_to_string(&path).expect("Failed to read loss log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["p_loss", "0.5", "-0.25"]);
        assert!(!LossLogObserver::file_path(temp_dir.path(), 0, 300).exists());
    }

    #[test]
    fn test_distribution_log_reads_without_touching_state() {
        let mut observer = DistributionLogObserver::new();
        let ledger = EpisodeRewardLedger::new(2);
        let distribution = OpponentDistribution::from_weights(vec![0.0, 5.0]).unwrap();
        let report = EvaluationReport {
            started_at: 2,
            finished_at: 9,
            performances: vec![-2.0, -4.0],
            worst_level: 1,
            episodes_scored: 6,
        };

        observer.on_checkpoint(9, &ledger, &distribution).unwrap();
        observer.on_evaluation_completed(&report, &distribution).unwrap();
        assert_eq!(distribution.weights(), &[0.0, 5.0]);
        assert_eq!(ledger.completed(), 0);
    }

    #[test]
    fn test_progress_observer_without_start_is_inert() {
        let mut observer = ProgressObserver::new();
        let ledger = EpisodeRewardLedger::new(2);
        assert!(observer.on_episode_end(1, &ledger).is_ok());
    }
}
