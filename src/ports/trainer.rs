//! Trainer port - the per-slot policy learner driven by the curriculum
//!
//! One trainer exists per roster slot (one per opponent level plus the super
//! agent). The curriculum only ever calls the methods below; network
//! architecture and gradient computation stay behind this boundary.

use std::collections::BTreeMap;

use crate::{
    Result,
    roles::{Role, RoleTag},
    types::{Action, Transition, UpdateLoss},
};

/// Trainer trait - unified interface for every roster slot
///
/// # Call Sequence
///
/// Within a single environment step the loop calls, for the two selected
/// trainers only:
/// 1. `action(observation)`
/// 2. `experience(transition)`
///
/// and then, for the super agent only and only when updates are enabled:
/// 3. `preupdate()`
/// 4. `update(peers, step)`
///
/// # Examples
///
/// ```no_run
/// use levelk::ports::Trainer;
///
/// fn act_greedily(trainer: &dyn Trainer, observation: &[f64]) -> Vec<f64> {
///     trainer.policy_action(observation)
/// }
/// ```
pub trait Trainer: Send {
    /// Unique scoped name, e.g. `level_2_attacker_0` or `super_defender_1`.
    ///
    /// Checkpoint variables owned by this trainer are prefixed with it.
    fn name(&self) -> &str;

    /// Select an action for training, exploration noise included.
    fn action(&mut self, observation: &[f64]) -> Result<Action>;

    /// Deterministic policy output, used by peers that condition on this
    /// trainer's behaviour.
    fn policy_action(&self, observation: &[f64]) -> Action;

    /// Record one transition into replay memory.
    fn experience(&mut self, transition: Transition);

    /// Hook run before `update`.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn preupdate(&mut self) {}

    /// Run a learning update.
    ///
    /// `peers` are the other members of the selected pair for this step.
    /// Their observations are not passed in, so a centralised critic queries
    /// `peer.policy_action` on the learner's own stored observations.
    /// Returns `Ok(None)` when the trainer decided not to update (for example
    /// because its replay memory is still too small).
    fn update(&mut self, peers: &[&dyn Trainer], step: u64) -> Result<Option<UpdateLoss>>;

    /// Snapshot of all parameters, keyed by scoped variable name.
    fn variables(&self) -> BTreeMap<String, Vec<f64>>;

    /// Restore parameters from a prefix-filtered variable map.
    ///
    /// Returns the number of variables restored.
    fn restore_variables(&mut self, variables: &BTreeMap<String, Vec<f64>>) -> Result<usize>;

    /// Seed the trainer's internal random number generator.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn set_rng_seed(&mut self, _seed: u64) {}

    /// Enable downcasting to concrete types.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Everything a factory needs to build the trainer for one roster slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerSpec {
    /// Scoped trainer name
    pub name: String,
    /// Side this trainer plays
    pub role: Role,
    /// Opponent level, `None` for the super agent
    pub level: Option<usize>,
    /// Agent index inside the environment
    pub env_index: usize,
    /// Whether this slot is the trainable super agent
    pub trainable: bool,
}

impl TrainerSpec {
    /// Algorithm-level tag for this slot
    pub fn tag(&self) -> RoleTag {
        self.role.tag()
    }
}

/// Builds trainers for roster slots.
pub trait TrainerFactory {
    /// Create the trainer described by `spec`.
    fn create(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>>;
}

impl<F> TrainerFactory for F
where
    F: Fn(&TrainerSpec) -> Result<Box<dyn Trainer>>,
{
    fn create(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        self(spec)
    }
}
