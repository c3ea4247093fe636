//! Linear actor-critic trainer with replay memory
//!
//! Actor: `a = tanh(W [o; 1])`. Critic: `Q = v . [o; a; a_peer?; 1]`.
//! With a centralized critic the peer's deterministic action is part of the
//! critic input; with a local critic it is left out.

use std::collections::{BTreeMap, VecDeque};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    ports::Trainer,
    types::{Action, Transition, UpdateLoss},
};

/// Hyperparameters for [`LinearActorCritic`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearTrainerConfig {
    pub learning_rate: f64,
    pub gamma: f64,
    pub batch_size: usize,
    pub buffer_capacity: usize,
    /// Only every `update_interval`-th global step performs an update
    pub update_interval: u64,
    /// Soft target update rate
    pub tau: f64,
    /// Half-width of the uniform exploration noise
    pub exploration: f64,
}

impl Default for LinearTrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            gamma: 0.95,
            batch_size: 1024,
            buffer_capacity: 1_000_000,
            update_interval: 100,
            tau: 0.01,
            exploration: 0.1,
        }
    }
}

/// Linear actor-critic with a ring replay buffer.
pub struct LinearActorCritic {
    name: String,
    observation_dim: usize,
    action_dim: usize,
    centralized: bool,
    config: LinearTrainerConfig,
    actor: Vec<f64>,
    critic: Vec<f64>,
    target_actor: Vec<f64>,
    target_critic: Vec<f64>,
    buffer: VecDeque<Transition>,
    sample_indices: Option<Vec<usize>>,
    rng: StdRng,
}

impl LinearActorCritic {
    /// Create a trainer with zero-initialised parameters.
    ///
    /// `local_q = true` gives the DDPG-style local critic; otherwise the critic
    /// also sees the peer's action.
    pub fn new(
        name: impl Into<String>,
        observation_dim: usize,
        action_dim: usize,
        local_q: bool,
        config: LinearTrainerConfig,
    ) -> Self {
        let centralized = !local_q;
        let actor_len = action_dim * (observation_dim + 1);
        let critic_len = critic_input_len(observation_dim, action_dim, centralized);
        Self {
            name: name.into(),
            observation_dim,
            action_dim,
            centralized,
            config,
            actor: vec![0.0; actor_len],
            critic: vec![0.0; critic_len],
            target_actor: vec![0.0; actor_len],
            target_critic: vec![0.0; critic_len],
            buffer: VecDeque::new(),
            sample_indices: None,
            rng: StdRng::seed_from_u64(rand::random::<u64>()),
        }
    }

    pub fn is_centralized(&self) -> bool {
        self.centralized
    }

    /// Number of stored transitions
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn act_with(&self, weights: &[f64], observation: &[f64]) -> Action {
        let width = self.observation_dim + 1;
        (0..self.action_dim)
            .map(|row| {
                let w = &weights[row * width..(row + 1) * width];
                let pre: f64 = w[..self.observation_dim]
                    .iter()
                    .zip(observation)
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    + w[self.observation_dim];
                pre.tanh()
            })
            .collect()
    }

    fn critic_features(&self, observation: &[f64], action: &[f64], peer: Option<&[f64]>) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.critic.len());
        features.extend_from_slice(observation);
        features.extend_from_slice(action);
        if self.centralized {
            match peer {
                Some(peer) => features.extend_from_slice(peer),
                None => features.extend(std::iter::repeat_n(0.0, self.action_dim)),
            }
        }
        features.push(1.0);
        features
    }

    fn batch_indices(&mut self) -> Vec<usize> {
        if let Some(indices) = &self.sample_indices {
            return indices.clone();
        }
        let len = self.buffer.len();
        let indices: Vec<usize> = (0..self.config.batch_size)
            .map(|_| self.rng.random_range(0..len))
            .collect();
        self.sample_indices = Some(indices.clone());
        indices
    }

    fn scoped(&self, variable: &str) -> String {
        format!("{}/{}", self.name, variable)
    }
}

fn critic_input_len(observation_dim: usize, action_dim: usize, centralized: bool) -> usize {
    observation_dim + action_dim + if centralized { action_dim } else { 0 } + 1
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn soft_update(target: &mut [f64], source: &[f64], tau: f64) {
    for (t, s) in target.iter_mut().zip(source) {
        *t = (1.0 - tau) * *t + tau * s;
    }
}

impl Trainer for LinearActorCritic {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&mut self, observation: &[f64]) -> Result<Action> {
        if observation.len() != self.observation_dim {
            return Err(Error::Environment {
                message: format!(
                    "{} expected observation of length {}, got {}",
                    self.name,
                    self.observation_dim,
                    observation.len()
                ),
            });
        }
        let noise = self.config.exploration;
        let mut action = self.act_with(&self.actor, observation);
        if noise > 0.0 {
            for value in &mut action {
                *value = (*value + self.rng.random_range(-noise..noise)).clamp(-1.0, 1.0);
            }
        }
        Ok(action)
    }

    fn policy_action(&self, observation: &[f64]) -> Action {
        self.act_with(&self.actor, observation)
    }

    fn experience(&mut self, transition: Transition) {
        if self.buffer.len() == self.config.buffer_capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    fn preupdate(&mut self) {
        self.sample_indices = None;
    }

    fn update(&mut self, peers: &[&dyn Trainer], step: u64) -> Result<Option<UpdateLoss>> {
        if self.buffer.len() < self.config.batch_size
            || self.config.update_interval == 0
            || !step.is_multiple_of(self.config.update_interval)
        {
            return Ok(None);
        }
        let peer = if self.centralized { peers.first().copied() } else { None };

        let indices = self.batch_indices();
        let batch = indices.len() as f64;
        let lr = self.config.learning_rate;
        let gamma = self.config.gamma;

        // Critic: one TD step towards the target networks' bootstrap
        let mut critic_grad = vec![0.0; self.critic.len()];
        let mut q_loss = 0.0;
        let mut target_sum = 0.0;
        let mut reward_sum = 0.0;
        for &index in &indices {
            let t = &self.buffer[index];
            let next_action = self.act_with(&self.target_actor, &t.next_observation);
            let next_peer = peer.map(|p| p.policy_action(&t.next_observation));
            let next_features =
                self.critic_features(&t.next_observation, &next_action, next_peer.as_deref());
            let continuation = if t.done { 0.0 } else { 1.0 };
            let target = t.reward + gamma * continuation * dot(&self.target_critic, &next_features);

            let current_peer = peer.map(|p| p.policy_action(&t.observation));
            let features = self.critic_features(&t.observation, &t.action, current_peer.as_deref());
            let td = dot(&self.critic, &features) - target;
            for (g, f) in critic_grad.iter_mut().zip(&features) {
                *g += td * f;
            }
            q_loss += td * td;
            target_sum += target;
            reward_sum += t.reward;
        }
        for (w, g) in self.critic.iter_mut().zip(&critic_grad) {
            *w -= lr * g / batch;
        }

        // Actor: ascend dQ/da through the tanh
        let action_offset = self.observation_dim;
        let width = self.observation_dim + 1;
        let mut actor_grad = vec![0.0; self.actor.len()];
        let mut p_loss = 0.0;
        for &index in &indices {
            let observation = &self.buffer[index].observation;
            let action = self.act_with(&self.actor, observation);
            let current_peer = peer.map(|p| p.policy_action(observation));
            let features = self.critic_features(observation, &action, current_peer.as_deref());
            p_loss -= dot(&self.critic, &features);
            for (row, a) in action.iter().enumerate() {
                let dq_da = self.critic[action_offset + row];
                let scale = dq_da * (1.0 - a * a);
                let grad_row = &mut actor_grad[row * width..(row + 1) * width];
                for (g, o) in grad_row.iter_mut().zip(observation.iter().chain([&1.0])) {
                    *g += scale * o;
                }
            }
        }
        for (w, g) in self.actor.iter_mut().zip(&actor_grad) {
            *w += lr * g / batch;
        }

        soft_update(&mut self.target_critic, &self.critic, self.config.tau);
        soft_update(&mut self.target_actor, &self.actor, self.config.tau);

        Ok(Some(UpdateLoss {
            q_loss: q_loss / batch,
            p_loss: p_loss / batch,
            mean_target_q: target_sum / batch,
            mean_reward: reward_sum / batch,
        }))
    }

    fn variables(&self) -> BTreeMap<String, Vec<f64>> {
        BTreeMap::from([
            (self.scoped("actor/weights"), self.actor.clone()),
            (self.scoped("critic/weights"), self.critic.clone()),
            (self.scoped("target_actor/weights"), self.target_actor.clone()),
            (self.scoped("target_critic/weights"), self.target_critic.clone()),
        ])
    }

    fn restore_variables(&mut self, variables: &BTreeMap<String, Vec<f64>>) -> Result<usize> {
        let mut restored = 0;
        for (suffix, slot) in [
            ("actor/weights", &mut self.actor),
            ("critic/weights", &mut self.critic),
            ("target_actor/weights", &mut self.target_actor),
            ("target_critic/weights", &mut self.target_critic),
        ] {
            let name = format!("{}/{}", self.name, suffix);
            if let Some(values) = variables.get(&name) {
                if values.len() != slot.len() {
                    return Err(Error::VariableShape {
                        name,
                        expected: slot.len(),
                        got: values.len(),
                    });
                }
                slot.copy_from_slice(values);
                restored += 1;
            }
        }
        Ok(restored)
    }

    fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> LinearTrainerConfig {
        LinearTrainerConfig {
            batch_size: 4,
            update_interval: 1,
            ..LinearTrainerConfig::default()
        }
    }

    fn transition(reward: f64) -> Transition {
        Transition {
            observation: vec![1.0, 0.0],
            action: vec![0.5],
            reward,
            next_observation: vec![0.0, 1.0],
            done: false,
            terminal: false,
        }
    }

    #[test]
    fn test_no_update_until_buffer_fills() {
        let mut trainer = LinearActorCritic::new("super_defender_1", 2, 1, true, small_config());
        trainer.experience(transition(1.0));
        assert!(trainer.update(&[], 1).unwrap().is_none());
    }

    #[test]
    fn test_update_moves_critic_towards_reward() {
        let mut trainer = LinearActorCritic::new("super_defender_1", 2, 1, true, small_config());
        trainer.set_rng_seed(3);
        for _ in 0..8 {
            trainer.experience(transition(1.0));
        }
        trainer.preupdate();
        let loss = trainer.update(&[], 1).unwrap().expect("update should run");
        assert_eq!(loss.mean_reward, 1.0);
        assert!(loss.q_loss > 0.0);

        let features = trainer.critic_features(&[1.0, 0.0], &[0.5], None);
        assert!(dot(&trainer.critic, &features) > 0.0);
    }

    #[test]
    fn test_update_respects_interval() {
        let config = LinearTrainerConfig {
            batch_size: 1,
            update_interval: 100,
            ..LinearTrainerConfig::default()
        };
        let mut trainer = LinearActorCritic::new("a", 2, 1, false, config);
        trainer.experience(transition(0.0));
        assert!(trainer.update(&[], 99).unwrap().is_none());
        assert!(trainer.update(&[], 100).unwrap().is_some());
    }

    #[test]
    fn test_centralized_critic_reads_peer() {
        let peer = LinearActorCritic::new("level_0_attacker_0", 2, 1, true, small_config());
        let mut trainer = LinearActorCritic::new("super_defender_1", 2, 1, false, small_config());
        assert!(trainer.is_centralized());
        for _ in 0..4 {
            trainer.experience(transition(-1.0));
        }
        let loss = trainer.update(&[&peer], 1).unwrap().unwrap();
        assert_eq!(loss.mean_reward, -1.0);
    }

    /// Peer that remembers which observations it was asked to act on
    struct ObservationEcho(std::sync::Mutex<Vec<Vec<f64>>>);

    impl Trainer for ObservationEcho {
        fn name(&self) -> &str {
            "level_0_attacker_0"
        }

        fn action(&mut self, observation: &[f64]) -> Result<Action> {
            Ok(self.policy_action(observation))
        }

        fn policy_action(&self, observation: &[f64]) -> Action {
            self.0.lock().unwrap().push(observation.to_vec());
            vec![0.0]
        }

        fn experience(&mut self, _transition: Transition) {}

        fn update(&mut self, _peers: &[&dyn Trainer], _step: u64) -> Result<Option<UpdateLoss>> {
            Ok(None)
        }

        fn variables(&self) -> BTreeMap<String, Vec<f64>> {
            BTreeMap::new()
        }

        fn restore_variables(&mut self, _variables: &BTreeMap<String, Vec<f64>>) -> Result<usize> {
            Ok(0)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_peer_is_queried_on_learner_observations() {
        let peer = ObservationEcho(std::sync::Mutex::new(Vec::new()));
        let mut trainer = LinearActorCritic::new("super_defender_1", 2, 1, false, small_config());
        for _ in 0..4 {
            trainer.experience(transition(0.0));
        }
        trainer.update(&[&peer], 1).unwrap().unwrap();

        let seen = peer.0.lock().unwrap();
        assert!(!seen.is_empty());
        for observation in seen.iter() {
            assert!(
                observation == &vec![1.0, 0.0] || observation == &vec![0.0, 1.0],
                "peer saw {observation:?}"
            );
        }
        assert!(seen.contains(&vec![1.0, 0.0]));
        assert!(seen.contains(&vec![0.0, 1.0]));
    }

    #[test]
    fn test_actions_stay_in_bounds() {
        let mut trainer = LinearActorCritic::new("a", 2, 2, true, small_config());
        trainer.set_rng_seed(1);
        for _ in 0..20 {
            let action = trainer.action(&[3.0, -2.0]).unwrap();
            assert!(action.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
        assert!(trainer.action(&[1.0]).is_err());
    }

    #[test]
    fn test_variables_restore_under_scope() {
        let mut source = LinearActorCritic::new("level_1_attacker_0", 2, 1, true, small_config());
        source.actor = vec![0.1, 0.2, 0.3];
        let variables = source.variables();
        assert!(variables.keys().all(|k| k.starts_with("level_1_attacker_0/")));

        let mut restored = LinearActorCritic::new("level_1_attacker_0", 2, 1, true, small_config());
        assert_eq!(restored.restore_variables(&variables).unwrap(), 4);
        assert_eq!(restored.policy_action(&[1.0, 1.0]), source.policy_action(&[1.0, 1.0]));

        let mut wrong_shape = LinearActorCritic::new("level_1_attacker_0", 3, 1, true, small_config());
        assert!(matches!(
            wrong_shape.restore_variables(&variables),
            Err(Error::VariableShape { .. })
        ));
    }
}
