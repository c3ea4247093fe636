//! Value types shared between the training loop, trainers and environments

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Observation vector for a single agent
pub type Observation = Vec<f64>;

/// Continuous action vector for a single agent
pub type Action = Vec<f64>;

/// Per-agent diagnostic values reported by the environment on each step
pub type StepInfo = BTreeMap<String, f64>;

/// One transition recorded into a trainer's replay memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Observation,
    pub action: Action,
    pub reward: f64,
    pub next_observation: Observation,
    /// Environment reported the agent as done
    pub done: bool,
    /// Episode hit the step limit
    pub terminal: bool,
}

/// Losses reported by a trainer update that actually performed a gradient step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateLoss {
    /// Critic loss
    pub q_loss: f64,
    /// Policy loss
    pub p_loss: f64,
    /// Mean bootstrapped critic target over the batch
    pub mean_target_q: f64,
    /// Mean reward over the batch
    pub mean_reward: f64,
}

/// Named parameter snapshot, keyed by fully-scoped variable name.
///
/// Variable names start with the owning trainer's scope (`level_0_attacker_0/actor/weights`),
/// which lets one file carry several independently trained networks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub variables: BTreeMap<String, Vec<f64>>,
}

impl Checkpoint {
    /// Create an empty checkpoint
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set of variables, replacing any with the same name.
    pub fn extend<I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        self.variables.extend(variables);
    }

    /// Variables whose name starts with `prefix`.
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<String, Vec<f64>> {
        self.variables
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_filter_isolates_scopes() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.extend([
            ("level_0_attacker_0/actor/weights".to_string(), vec![1.0]),
            ("level_1_attacker_0/actor/weights".to_string(), vec![2.0]),
            ("super_defender_1/actor/weights".to_string(), vec![3.0]),
        ]);

        let level_one = checkpoint.with_prefix("level_1_attacker_0");
        assert_eq!(level_one.len(), 1);
        assert_eq!(level_one["level_1_attacker_0/actor/weights"], vec![2.0]);
        assert!(checkpoint.with_prefix("level_2").is_empty());
    }
}
