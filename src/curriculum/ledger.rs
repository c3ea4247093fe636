//! Per-episode reward accounting

use serde::{Deserialize, Serialize};

/// Cumulative rewards, one entry per started episode.
///
/// `episode_rewards` sums over all agents; `agent_rewards[a]` tracks agent `a`
/// alone. The last entry belongs to the episode in progress, so after a
/// boundary the just-finished episode sits at the second-to-last position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRewardLedger {
    episode_rewards: Vec<f64>,
    agent_rewards: Vec<Vec<f64>>,
}

impl EpisodeRewardLedger {
    /// Ledger for `num_agents` environment agents, with the first episode open.
    pub fn new(num_agents: usize) -> Self {
        Self {
            episode_rewards: vec![0.0],
            agent_rewards: vec![vec![0.0]; num_agents],
        }
    }

    /// Add one step's reward vector to the open episode.
    pub fn record_step(&mut self, rewards: &[f64]) {
        for (agent, reward) in rewards.iter().enumerate() {
            if let Some(total) = self.episode_rewards.last_mut() {
                *total += reward;
            }
            if let Some(entry) = self
                .agent_rewards
                .get_mut(agent)
                .and_then(|series| series.last_mut())
            {
                *entry += reward;
            }
        }
    }

    /// Close the current episode and open a new zeroed one.
    pub fn start_episode(&mut self) {
        self.episode_rewards.push(0.0);
        for series in &mut self.agent_rewards {
            series.push(0.0);
        }
    }

    /// Number of episodes started, including the open one.
    pub fn len(&self) -> usize {
        self.episode_rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episode_rewards.is_empty()
    }

    /// Number of fully completed episodes.
    pub fn completed(&self) -> usize {
        self.episode_rewards.len().saturating_sub(1)
    }

    pub fn num_agents(&self) -> usize {
        self.agent_rewards.len()
    }

    pub fn episode_rewards(&self) -> &[f64] {
        &self.episode_rewards
    }

    pub fn agent_rewards(&self, agent: usize) -> &[f64] {
        &self.agent_rewards[agent]
    }

    /// Running total of the open episode for `agent`.
    pub fn current_agent_reward(&self, agent: usize) -> f64 {
        self.agent_rewards[agent].last().copied().unwrap_or(0.0)
    }

    /// Return of `agent` in the most recently completed episode.
    pub fn last_completed_agent_reward(&self, agent: usize) -> Option<f64> {
        let series = &self.agent_rewards[agent];
        series.len().checked_sub(2).map(|index| series[index])
    }

    /// Mean total reward over the last `window` entries.
    pub fn mean_recent(&self, window: usize) -> f64 {
        mean_tail(&self.episode_rewards, window)
    }

    /// Mean reward of each agent over the last `window` entries.
    pub fn agent_means_recent(&self, window: usize) -> Vec<f64> {
        self.agent_rewards
            .iter()
            .map(|series| mean_tail(series, window))
            .collect()
    }
}

fn mean_tail(series: &[f64], window: usize) -> f64 {
    let start = series.len().saturating_sub(window);
    let tail = &series[start..];
    if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}
