//! Periodic freeze-and-measure evaluation of the super agent
//!
//! Every `rate` completed episodes the super agent is frozen and played
//! against each opponent level `length` times. Once every queued episode has
//! been scored, the level with the lowest mean return gets its sampling weight
//! raised so that training concentrates where the agent is weakest.
//!
//! The scheduler is a three-state machine driven only at episode boundaries:
//!
//! ```text
//! Idle --(completed % rate == 0)--> Evaluating --(queue empty)--> Completing --(next boundary)--> Idle
//! ```
//!
//! `Completing` lasts exactly one episode: the episode that follows the last
//! scored one is still played update-free against the last evaluated level,
//! and its return is not scored.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, curriculum::sampler::OpponentDistribution};

/// Evaluation schedule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Completed episodes between evaluation cycles
    pub rate: usize,
    /// Episodes played against each level per cycle
    pub length: usize,
    /// Weight given to the worst level when a cycle completes
    pub worst_level_weight: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            rate: 5000,
            length: 100,
            worst_level_weight: 1.0,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(Error::config("evaluate-rate must be at least 1"));
        }
        if self.length == 0 {
            return Err(Error::config("evaluate-length must be at least 1"));
        }
        if !self.worst_level_weight.is_finite() || self.worst_level_weight <= 0.0 {
            return Err(Error::config("worst-level weight must be positive and finite"));
        }
        Ok(())
    }
}

/// In-flight evaluation cycle
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    remaining: VecDeque<usize>,
    current_level: usize,
    performance: Vec<f64>,
    episodes_scored: usize,
    started_at: usize,
}

impl EvaluationRun {
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Queued (level, episode) entries not yet started
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Accumulated (not yet normalized) return per level
    pub fn performance(&self) -> &[f64] {
        &self.performance
    }

    pub fn episodes_scored(&self) -> usize {
        self.episodes_scored
    }
}

/// Scheduler state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EvaluationPhase {
    /// Normal training
    #[default]
    Idle,
    /// Scoring queued episodes
    Evaluating(EvaluationRun),
    /// Every queued episode scored; returns to `Idle` at the next boundary
    Completing(EvaluationRun),
}

/// Result of a finished evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Completed-episode count that triggered the cycle
    pub started_at: usize,
    /// Completed-episode count at which the cycle returned to idle
    pub finished_at: usize,
    /// Mean return of the super agent against each level
    pub performances: Vec<f64>,
    /// First level with the minimum mean return
    pub worst_level: usize,
    /// Number of scored episodes
    pub episodes_scored: usize,
}

/// Something the scheduler did at an episode boundary
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationEvent {
    /// Cycle finished and sampling weights updated
    Completed(EvaluationReport),
    /// A new cycle began against `level`
    Started { level: usize, scheduled: usize },
    /// Finished episode scored; moved on to `level`
    Advanced { level: usize, remaining: usize },
    /// Last queued episode scored
    Exhausted { level: usize },
}

/// Alias kept for call sites that only care about the outcome list
pub type BoundaryOutcome = Vec<EvaluationEvent>;

/// Drives evaluation cycles and keeps the worst-level history.
#[derive(Debug, Clone)]
pub struct EvaluationScheduler {
    config: EvaluationConfig,
    num_levels: usize,
    phase: EvaluationPhase,
    worst_levels: Vec<usize>,
}

impl EvaluationScheduler {
    pub fn new(config: EvaluationConfig, num_levels: usize) -> Result<Self> {
        config.validate()?;
        if num_levels == 0 {
            return Err(Error::config("at least one opponent level is required"));
        }
        Ok(Self {
            config,
            num_levels,
            phase: EvaluationPhase::Idle,
            worst_levels: Vec::new(),
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn phase(&self) -> &EvaluationPhase {
        &self.phase
    }

    /// True while learning updates must be suppressed.
    pub fn is_evaluating(&self) -> bool {
        !matches!(self.phase, EvaluationPhase::Idle)
    }

    /// Worst level of every completed cycle, oldest first.
    pub fn worst_level_history(&self) -> &[usize] {
        &self.worst_levels
    }

    /// Advance the state machine at an episode boundary.
    ///
    /// `completed_episodes` counts episodes finished so far (including the one
    /// that just ended). `last_return` is the super agent's return in that
    /// episode. `distribution` is rewritten as the cycle progresses.
    pub fn on_episode_boundary(
        &mut self,
        completed_episodes: usize,
        last_return: f64,
        distribution: &mut OpponentDistribution,
    ) -> BoundaryOutcome {
        let mut events = Vec::new();

        match std::mem::take(&mut self.phase) {
            EvaluationPhase::Idle => {}
            EvaluationPhase::Completing(run) => {
                let report = self.complete(run, completed_episodes, distribution);
                events.push(EvaluationEvent::Completed(report));
            }
            EvaluationPhase::Evaluating(mut run) => {
                run.performance[run.current_level] += last_return;
                run.episodes_scored += 1;
                match run.remaining.pop_front() {
                    Some(level) => {
                        run.current_level = level;
                        distribution.set_one_hot(level);
                        events.push(EvaluationEvent::Advanced {
                            level,
                            remaining: run.remaining.len(),
                        });
                        self.phase = EvaluationPhase::Evaluating(run);
                    }
                    None => {
                        distribution.set_one_hot(run.current_level);
                        events.push(EvaluationEvent::Exhausted {
                            level: run.current_level,
                        });
                        self.phase = EvaluationPhase::Completing(run);
                    }
                }
            }
        }

        if matches!(self.phase, EvaluationPhase::Idle)
            && completed_episodes > 0
            && completed_episodes.is_multiple_of(self.config.rate)
        {
            let run = self.start(completed_episodes, distribution);
            events.push(EvaluationEvent::Started {
                level: run.current_level,
                scheduled: run.remaining.len() + 1,
            });
            self.phase = EvaluationPhase::Evaluating(run);
        }

        events
    }

    fn start(&self, completed_episodes: usize, distribution: &mut OpponentDistribution) -> EvaluationRun {
        let mut remaining: VecDeque<usize> = (0..self.num_levels)
            .flat_map(|level| std::iter::repeat_n(level, self.config.length))
            .collect();
        // length >= 1 and num_levels >= 1, so the queue is never empty here
        let current_level = remaining.pop_front().unwrap_or(0);
        distribution.set_one_hot(current_level);

        EvaluationRun {
            remaining,
            current_level,
            performance: vec![0.0; self.num_levels],
            episodes_scored: 0,
            started_at: completed_episodes,
        }
    }

    fn complete(
        &mut self,
        run: EvaluationRun,
        completed_episodes: usize,
        distribution: &mut OpponentDistribution,
    ) -> EvaluationReport {
        let performances: Vec<f64> = run
            .performance
            .iter()
            .map(|total| total / self.config.length as f64)
            .collect();
        let worst_level = argmin_first(&performances);
        self.worst_levels.push(worst_level);

        // Still one-hot on the last evaluated level
        distribution.set_weight(worst_level, self.config.worst_level_weight);

        EvaluationReport {
            started_at: run.started_at,
            finished_at: completed_episodes,
            performances,
            worst_level,
            episodes_scored: run.episodes_scored,
        }
    }
}

/// Index of the smallest value; ties go to the lowest index.
fn argmin_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate().skip(1) {
        if *value < values[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(rate: usize, length: usize, levels: usize) -> EvaluationScheduler {
        EvaluationScheduler::new(
            EvaluationConfig {
                rate,
                length,
                worst_level_weight: 1.0,
            },
            levels,
        )
        .unwrap()
    }

    /// Feed boundaries until the scheduler returns to idle; returns the report.
    fn run_cycle(
        scheduler: &mut EvaluationScheduler,
        distribution: &mut OpponentDistribution,
        start: usize,
        returns_per_level: &dyn Fn(usize, usize) -> f64,
    ) -> (EvaluationReport, Vec<usize>) {
        let mut played_levels = Vec::new();
        let mut episode = start;
        let events = scheduler.on_episode_boundary(episode, 0.0, distribution);
        assert!(matches!(events[0], EvaluationEvent::Started { .. }));

        loop {
            let level = distribution
                .weights()
                .iter()
                .position(|w| *w == 1.0)
                .expect("one-hot distribution during evaluation");
            played_levels.push(level);
            episode += 1;
            let reward = returns_per_level(level, played_levels.len());
            for event in scheduler.on_episode_boundary(episode, reward, distribution) {
                if let EvaluationEvent::Completed(report) = event {
                    return (report, played_levels);
                }
            }
        }
    }

    #[test]
    fn test_queue_order_and_counts() {
        let mut scheduler = scheduler(10, 3, 2);
        let mut distribution = OpponentDistribution::uniform(2);
        let (report, played) = run_cycle(&mut scheduler, &mut distribution, 10, &|level, _| {
            if level == 0 { 1.0 } else { 5.0 }
        });

        // 3 scored episodes per level plus the completing episode on the last level
        assert_eq!(played, vec![0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(report.episodes_scored, 6);
        assert_eq!(report.performances, vec![1.0, 5.0]);
        assert_eq!(report.worst_level, 0);
        assert_eq!(report.started_at, 10);
        assert_eq!(report.finished_at, 17);
        assert_eq!(scheduler.worst_level_history(), &[0]);
        assert!(!scheduler.is_evaluating());
    }

    #[test]
    fn test_completion_elevates_worst_on_last_evaluated_weights() {
        let mut scheduler = EvaluationScheduler::new(
            EvaluationConfig {
                rate: 100,
                length: 1,
                worst_level_weight: 10.0,
            },
            3,
        )
        .unwrap();
        let mut distribution = OpponentDistribution::from_weights(vec![0.2, 0.3, 0.5]).unwrap();
        let (report, _) = run_cycle(&mut scheduler, &mut distribution, 100, &|level, _| {
            [3.0, -2.0, 0.0][level]
        });

        assert_eq!(report.worst_level, 1);
        // Pre-evaluation weights are gone; the last level keeps its one-hot weight
        assert_eq!(distribution.weights(), &[0.0, 10.0, 1.0]);
    }

    #[test]
    fn test_uniform_start_ends_with_last_and_worst_levels_only() {
        let mut scheduler = scheduler(100, 1, 3);
        let mut distribution = OpponentDistribution::uniform(3);
        let (report, played) = run_cycle(&mut scheduler, &mut distribution, 100, &|level, _| {
            [-5.0, 1.0, 2.0][level]
        });

        assert_eq!(played, vec![0, 1, 2, 2]);
        assert_eq!(report.worst_level, 0);
        assert_eq!(distribution.weights(), &[1.0, 0.0, 1.0]);
        assert_eq!(distribution.probabilities(), vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_second_cycle_replaces_previous_worst_level() {
        let mut scheduler = scheduler(10, 1, 3);
        let mut distribution = OpponentDistribution::uniform(3);

        let (first, _) = run_cycle(&mut scheduler, &mut distribution, 10, &|level, _| {
            [-5.0, 1.0, 2.0][level]
        });
        assert_eq!(first.finished_at, 14);
        assert_eq!(distribution.weights(), &[1.0, 0.0, 1.0]);

        // Boundaries between cycles leave the distribution alone
        for episode in 15..20 {
            assert!(scheduler.on_episode_boundary(episode, 0.0, &mut distribution).is_empty());
        }
        assert_eq!(distribution.weights(), &[1.0, 0.0, 1.0]);

        let (second, played) = run_cycle(&mut scheduler, &mut distribution, 20, &|level, _| {
            [4.0, -3.0, 2.0][level]
        });
        assert_eq!(played, vec![0, 1, 2, 2]);
        assert_eq!(second.started_at, 20);
        assert_eq!(second.finished_at, 24);
        assert_eq!(second.worst_level, 1);
        assert_eq!(scheduler.worst_level_history(), &[0, 1]);
        // Level 0 no longer carries the first cycle's weight
        assert_eq!(distribution.weights(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ties_pick_lowest_level() {
        let mut scheduler = scheduler(1, 2, 3);
        let mut distribution = OpponentDistribution::uniform(3);
        let (report, _) = run_cycle(&mut scheduler, &mut distribution, 1, &|level, _| {
            if level == 0 { 4.0 } else { -1.0 }
        });
        assert_eq!(report.worst_level, 1);
    }

    #[test]
    fn test_replaying_inputs_gives_same_decision() {
        let returns = |level: usize, n: usize| (level as f64 * 1.7 - n as f64 * 0.3).sin();
        let decide = || {
            let mut scheduler = scheduler(5, 4, 3);
            let mut distribution = OpponentDistribution::uniform(3);
            let (report, _) = run_cycle(&mut scheduler, &mut distribution, 5, &returns);
            (report.worst_level, distribution)
        };
        assert_eq!(decide(), decide());
    }

    #[test]
    fn test_no_start_off_schedule_or_at_zero() {
        let mut scheduler = scheduler(3, 1, 2);
        let mut distribution = OpponentDistribution::uniform(2);
        assert!(scheduler.on_episode_boundary(0, 0.0, &mut distribution).is_empty());
        assert!(scheduler.on_episode_boundary(2, 0.0, &mut distribution).is_empty());
        assert!(!scheduler.is_evaluating());
        assert_eq!(distribution.weights(), &[0.5, 0.5]);
    }

    #[test]
    fn test_rate_multiple_during_evaluation_does_not_restart() {
        // rate 1 would fire at every boundary if restarts were allowed
        let mut scheduler = scheduler(1, 2, 2);
        let mut distribution = OpponentDistribution::uniform(2);
        let (report, played) = run_cycle(&mut scheduler, &mut distribution, 1, &|_, _| 0.0);
        assert_eq!(played.len(), 5);
        assert_eq!(report.episodes_scored, 4);
        // rate 1: a new cycle starts on the same boundary the old one completes
        assert!(scheduler.is_evaluating());
        assert_eq!(scheduler.worst_level_history(), &[0]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EvaluationConfig {
            rate: 0,
            ..EvaluationConfig::default()
        };
        assert!(EvaluationScheduler::new(config, 2).is_err());
        assert!(EvaluationScheduler::new(EvaluationConfig::default(), 0).is_err());
    }
}
