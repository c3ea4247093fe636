//! Environment port - the multi-agent stepping simulator

use std::path::Path;

use crate::{
    Result,
    types::{Action, Observation, StepInfo},
};

/// Result of a single environment step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observations: Vec<Observation>,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
    pub infos: Vec<StepInfo>,
}

impl Step {
    /// True if any agent reported done.
    pub fn any_done(&self) -> bool {
        self.dones.iter().any(|&done| done)
    }
}

/// Multi-agent environment
///
/// Agents are addressed by index; `step` takes exactly one action per agent,
/// in index order, and returns per-agent vectors in the same order.
pub trait Environment {
    /// Number of agents in the world
    fn num_agents(&self) -> usize;

    /// Observation length for `agent`
    fn observation_dim(&self, agent: usize) -> usize;

    /// Action length for `agent`
    fn action_dim(&self, agent: usize) -> usize;

    /// Start a new episode and return the initial observations.
    fn reset(&mut self) -> Vec<Observation>;

    /// Advance the world by one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the number or shape of actions does not match the
    /// environment's agents.
    fn step(&mut self, actions: &[Action]) -> Result<Step>;

    /// Draw the current state for a human observer.
    fn render(&self) -> Result<()> {
        Ok(())
    }

    /// Record a step into the environment's internal log.
    fn log(&mut self, _episode: usize, _step: usize, _outcome: &Step) {}

    /// Persist the internal log under `dir/filename`.
    fn save_log(&self, _dir: &Path, _filename: &str) -> Result<()> {
        Ok(())
    }

    /// Seed the environment's random number generator.
    fn set_rng_seed(&mut self, _seed: u64) {}
}
