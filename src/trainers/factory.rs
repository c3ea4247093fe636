//! Trainer construction for roster slots

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    ports::{Environment, Trainer, TrainerFactory, TrainerSpec},
    roles::RoleTag,
    trainers::linear::{LinearActorCritic, LinearTrainerConfig},
};

/// Critic flavour for a side of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Centralized critic that also sees the peer's action
    Maddpg,
    /// Local critic over the trainer's own observation and action
    Ddpg,
}

impl PolicyKind {
    pub fn label(&self) -> &'static str {
        match self {
            PolicyKind::Maddpg => "maddpg",
            PolicyKind::Ddpg => "ddpg",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maddpg" => Ok(PolicyKind::Maddpg),
            "ddpg" => Ok(PolicyKind::Ddpg),
            other => Err(Error::config(format!(
                "unknown policy '{other}', expected 'maddpg' or 'ddpg'"
            ))),
        }
    }
}

/// Builds a [`LinearActorCritic`] per slot, sized from the environment.
#[derive(Debug, Clone)]
pub struct StandardTrainerFactory {
    observation_dims: Vec<usize>,
    action_dims: Vec<usize>,
    good_policy: PolicyKind,
    adv_policy: PolicyKind,
    config: LinearTrainerConfig,
}

impl StandardTrainerFactory {
    pub fn new(env: &dyn Environment, config: LinearTrainerConfig) -> Self {
        let agents = 0..env.num_agents();
        Self {
            observation_dims: agents.clone().map(|a| env.observation_dim(a)).collect(),
            action_dims: agents.map(|a| env.action_dim(a)).collect(),
            good_policy: PolicyKind::Maddpg,
            adv_policy: PolicyKind::Maddpg,
            config,
        }
    }

    /// Set the policy kind for good agents and adversaries.
    pub fn with_policies(mut self, good_policy: PolicyKind, adv_policy: PolicyKind) -> Self {
        self.good_policy = good_policy;
        self.adv_policy = adv_policy;
        self
    }
}

impl TrainerFactory for StandardTrainerFactory {
    fn create(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        let (Some(&observation_dim), Some(&action_dim)) = (
            self.observation_dims.get(spec.env_index),
            self.action_dims.get(spec.env_index),
        ) else {
            return Err(Error::config(format!(
                "slot '{}' refers to environment agent {} but the environment has {}",
                spec.name,
                spec.env_index,
                self.observation_dims.len()
            )));
        };
        let policy = match spec.tag() {
            RoleTag::Adversary => self.adv_policy,
            RoleTag::Agent => self.good_policy,
        };
        Ok(Box::new(LinearActorCritic::new(
            spec.name.clone(),
            observation_dim,
            action_dim,
            policy == PolicyKind::Ddpg,
            self.config.clone(),
        )))
    }
}
