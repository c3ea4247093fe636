//! Mutable run state owned by the training loop

use crate::{
    Result,
    curriculum::{
        evaluation::{BoundaryOutcome, EvaluationConfig, EvaluationScheduler},
        layout::RoleLayout,
        ledger::EpisodeRewardLedger,
        matching::MatchPair,
        sampler::{OpponentDistribution, OpponentSample, OpponentSampler},
    },
};

/// Everything the episode/step loop mutates while it runs.
///
/// The distribution is written by the evaluation scheduler only; the sampler
/// reads it once per step.
pub struct TrainingContext {
    layout: RoleLayout,
    distribution: OpponentDistribution,
    ledger: EpisodeRewardLedger,
    evaluation: EvaluationScheduler,
    sampler: OpponentSampler,
    episode_step: usize,
    train_step: u64,
    updates: usize,
}

impl TrainingContext {
    /// Fresh run state with a uniform opponent distribution.
    pub fn new(
        layout: RoleLayout,
        evaluation: EvaluationConfig,
        num_agents: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            layout,
            distribution: OpponentDistribution::uniform(layout.num_levels()),
            ledger: EpisodeRewardLedger::new(num_agents),
            evaluation: EvaluationScheduler::new(evaluation, layout.num_levels())?,
            sampler: OpponentSampler::new(layout, seed),
            episode_step: 0,
            train_step: 0,
            updates: 0,
        })
    }

    pub fn layout(&self) -> &RoleLayout {
        &self.layout
    }

    pub fn distribution(&self) -> &OpponentDistribution {
        &self.distribution
    }

    pub fn ledger(&self) -> &EpisodeRewardLedger {
        &self.ledger
    }

    pub fn evaluation(&self) -> &EvaluationScheduler {
        &self.evaluation
    }

    pub fn worst_level_history(&self) -> &[usize] {
        self.evaluation.worst_level_history()
    }

    /// Steps taken in the open episode
    pub fn episode_step(&self) -> usize {
        self.episode_step
    }

    /// Global step counter passed to trainer updates
    pub fn train_step(&self) -> u64 {
        self.train_step
    }

    /// Number of update calls that returned a loss
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn is_evaluating(&self) -> bool {
        self.evaluation.is_evaluating()
    }

    /// Draw this step's opponent and order the interacting pair.
    pub fn select_match(&mut self) -> Result<(OpponentSample, MatchPair)> {
        let sample = self.sampler.sample(&self.distribution)?;
        let pair = sample.pair()?;
        Ok((sample, pair))
    }

    /// Account one environment step.
    pub fn record_step(&mut self, rewards: &[f64]) {
        self.ledger.record_step(rewards);
        self.episode_step += 1;
    }

    /// Close the open episode.
    pub fn end_episode(&mut self) {
        self.ledger.start_episode();
        self.episode_step = 0;
    }

    pub fn advance_train_step(&mut self) {
        self.train_step += 1;
    }

    pub fn count_update(&mut self) {
        self.updates += 1;
    }

    /// Let the evaluation scheduler react to the episode that just ended.
    pub fn on_episode_boundary(&mut self) -> BoundaryOutcome {
        let super_env = self.layout.super_env_index();
        let last_return = self
            .ledger
            .last_completed_agent_reward(super_env)
            .unwrap_or(0.0);
        let completed = self.ledger.completed();
        self.evaluation
            .on_episode_boundary(completed, last_return, &mut self.distribution)
    }
}
