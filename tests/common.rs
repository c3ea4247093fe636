//! Common test utilities for the levelk test suite.
//!
//! Provides a scripted two-agent environment whose rewards are driven by the
//! attacker's action, and recording trainers whose actions identify them.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use levelk::{
    Result,
    ports::{Environment, Step, Trainer, TrainerSpec},
    types::{Action, Observation, StepInfo, Transition, UpdateLoss},
};

/// Two-agent environment with fixed-length episodes.
///
/// Each step the attacker (agent 0) receives its own action value as reward
/// and the defender (agent 1) receives its negation.
pub struct ScriptedEnv {
    episode_len: usize,
    step: usize,
}

impl ScriptedEnv {
    pub fn new(episode_len: usize) -> Self {
        Self {
            episode_len,
            step: 0,
        }
    }
}

impl Environment for ScriptedEnv {
    fn num_agents(&self) -> usize {
        2
    }

    fn observation_dim(&self, _agent: usize) -> usize {
        1
    }

    fn action_dim(&self, _agent: usize) -> usize {
        1
    }

    fn reset(&mut self) -> Vec<Observation> {
        self.step = 0;
        vec![vec![0.0], vec![0.0]]
    }

    fn step(&mut self, actions: &[Action]) -> Result<Step> {
        self.step += 1;
        let pressure = actions[0][0];
        let done = self.step >= self.episode_len;
        let observation = vec![self.step as f64];
        let info: StepInfo = [("pressure".to_string(), pressure)].into_iter().collect();
        Ok(Step {
            observations: vec![observation.clone(), observation],
            rewards: vec![pressure, -pressure],
            dones: vec![done, done],
            infos: vec![info.clone(), info],
        })
    }
}

/// Everything the recording trainers saw, keyed by trainer name
#[derive(Debug, Default)]
pub struct CallLog {
    pub actions: BTreeMap<String, usize>,
    pub experiences: BTreeMap<String, usize>,
    pub update_steps: BTreeMap<String, Vec<u64>>,
    pub update_peers: BTreeMap<String, Vec<Vec<String>>>,
    pub restored: BTreeMap<String, Vec<String>>,
    pub seeds: BTreeMap<String, u64>,
}

impl CallLog {
    pub fn actions(&self, name: &str) -> usize {
        self.actions.get(name).copied().unwrap_or(0)
    }

    pub fn experiences(&self, name: &str) -> usize {
        self.experiences.get(name).copied().unwrap_or(0)
    }

    pub fn update_steps(&self, name: &str) -> Vec<u64> {
        self.update_steps.get(name).cloned().unwrap_or_default()
    }
}

pub type SharedLog = Arc<Mutex<CallLog>>;

/// Trainer that acts with a fixed value and records every call.
pub struct RecordingTrainer {
    name: String,
    marker: f64,
    log: SharedLog,
}

impl RecordingTrainer {
    pub fn new(name: impl Into<String>, marker: f64, log: SharedLog) -> Self {
        Self {
            name: name.into(),
            marker,
            log,
        }
    }
}

impl Trainer for RecordingTrainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&mut self, _observation: &[f64]) -> Result<Action> {
        *self
            .log
            .lock()
            .unwrap()
            .actions
            .entry(self.name.clone())
            .or_default() += 1;
        Ok(vec![self.marker])
    }

    fn policy_action(&self, _observation: &[f64]) -> Action {
        vec![self.marker]
    }

    fn experience(&mut self, _transition: Transition) {
        *self
            .log
            .lock()
            .unwrap()
            .experiences
            .entry(self.name.clone())
            .or_default() += 1;
    }

    fn update(&mut self, peers: &[&dyn Trainer], step: u64) -> Result<Option<UpdateLoss>> {
        let mut log = self.log.lock().unwrap();
        log.update_steps
            .entry(self.name.clone())
            .or_default()
            .push(step);
        log.update_peers
            .entry(self.name.clone())
            .or_default()
            .push(peers.iter().map(|peer| peer.name().to_string()).collect());
        Ok(Some(UpdateLoss {
            q_loss: 1.0,
            p_loss: -(step as f64),
            mean_target_q: 0.0,
            mean_reward: 0.0,
        }))
    }

    fn variables(&self) -> BTreeMap<String, Vec<f64>> {
        [(format!("{}/weights", self.name), vec![self.marker])]
            .into_iter()
            .collect()
    }

    fn restore_variables(&mut self, variables: &BTreeMap<String, Vec<f64>>) -> Result<usize> {
        if let Some(values) = variables.get(&format!("{}/weights", self.name)) {
            self.marker = values[0];
        }
        self.log
            .lock()
            .unwrap()
            .restored
            .insert(self.name.clone(), variables.keys().cloned().collect());
        Ok(variables.len())
    }

    fn set_rng_seed(&mut self, seed: u64) {
        self.log.lock().unwrap().seeds.insert(self.name.clone(), seed);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Factory closure: opponents at level `l` act with `l + 1`, the super agent with 0.
pub fn recording_factory(
    log: SharedLog,
) -> impl Fn(&TrainerSpec) -> Result<Box<dyn Trainer>> {
    move |spec: &TrainerSpec| {
        let marker = spec.level.map(|level| level as f64 + 1.0).unwrap_or(0.0);
        Ok(Box::new(RecordingTrainer::new(
            spec.name.clone(),
            marker,
            log.clone(),
        )) as Box<dyn Trainer>)
    }
}

pub fn shared_log() -> SharedLog {
    Arc::new(Mutex::new(CallLog::default()))
}
