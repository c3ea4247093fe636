//! Trainer roster: one trainer per level/role slot, fixed for the run

use crate::{
    Error, Result,
    curriculum::{layout::RoleLayout, matching::MatchPair},
    ports::{Trainer, TrainerFactory, TrainerSpec},
    types::Checkpoint,
};

/// Ordered, index-addressed set of trainers.
///
/// Exactly one slot (the layout's super agent index) is trainable; every other
/// slot holds an opponent level in contiguous level order.
pub struct TrainerRoster {
    layout: RoleLayout,
    specs: Vec<TrainerSpec>,
    trainers: Vec<Box<dyn Trainer>>,
}

/// Build the roster for `layout`, asking `factory` for one trainer per slot.
///
/// # Errors
///
/// Propagates factory failures; also fails if a factory returns a trainer whose
/// name does not match its slot, since checkpoint restore relies on it.
pub fn build_roster(layout: RoleLayout, factory: &dyn TrainerFactory) -> Result<TrainerRoster> {
    let specs = slot_specs(&layout);
    let mut trainers = Vec::with_capacity(specs.len());
    for spec in &specs {
        let trainer = factory.create(spec)?;
        if trainer.name() != spec.name {
            return Err(Error::config(format!(
                "trainer for slot '{}' reported name '{}'",
                spec.name,
                trainer.name()
            )));
        }
        trainers.push(trainer);
    }
    Ok(TrainerRoster {
        layout,
        specs,
        trainers,
    })
}

fn slot_specs(layout: &RoleLayout) -> Vec<TrainerSpec> {
    let super_spec = TrainerSpec {
        name: layout.super_agent_name(),
        role: layout.role(),
        level: None,
        env_index: layout.super_env_index(),
        trainable: true,
    };

    let mut specs = Vec::with_capacity(layout.roster_len());
    for index in 0..layout.roster_len() {
        match layout.level_for_index(index) {
            Some(level) => specs.push(TrainerSpec {
                name: layout.opponent_name(level),
                role: layout.opponent_role(),
                level: Some(level),
                env_index: layout.opponent_env_index(),
                trainable: false,
            }),
            None => specs.push(super_spec.clone()),
        }
    }
    specs
}

impl TrainerRoster {
    pub fn layout(&self) -> &RoleLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.trainers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trainers.is_empty()
    }

    /// Slot descriptions in roster order
    pub fn specs(&self) -> &[TrainerSpec] {
        &self.specs
    }

    pub fn get(&self, index: usize) -> Option<&dyn Trainer> {
        self.trainers.get(index).map(|trainer| trainer.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Trainer + 'static)> {
        self.trainers.get_mut(index).map(|trainer| trainer.as_mut())
    }

    pub fn super_agent(&self) -> &dyn Trainer {
        self.trainers[self.layout.super_agent_index()].as_ref()
    }

    pub fn super_agent_mut(&mut self) -> &mut dyn Trainer {
        self.trainers[self.layout.super_agent_index()].as_mut()
    }

    /// Trainers in roster order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Trainer> {
        self.trainers.iter().map(|trainer| trainer.as_ref())
    }

    /// Mutable super agent together with a shared view of its opponent in `pair`.
    pub fn split_pair(&mut self, pair: &MatchPair) -> (&mut dyn Trainer, &dyn Trainer) {
        let super_index = pair.super_index();
        let opponent_index = pair.opponent_index();
        if super_index < opponent_index {
            let (low, high) = self.trainers.split_at_mut(opponent_index);
            (low[super_index].as_mut(), high[0].as_ref())
        } else {
            let (low, high) = self.trainers.split_at_mut(super_index);
            (high[0].as_mut(), low[opponent_index].as_ref())
        }
    }

    /// Combined parameter snapshot of every trainer.
    pub fn snapshot(&self) -> Checkpoint {
        let mut checkpoint = Checkpoint::new();
        for trainer in &self.trainers {
            checkpoint.extend(trainer.variables());
        }
        checkpoint
    }

    /// Restore the opponent at `level` from `checkpoint`.
    ///
    /// Only variables prefixed with the opponent's scope are applied, so one
    /// checkpoint directory can hold several level networks side by side.
    pub fn restore_opponent(
        &mut self,
        level: usize,
        checkpoint: &Checkpoint,
        source: &str,
    ) -> Result<usize> {
        let index = self.layout.opponent_index_for_level(level)?;
        let prefix = self.layout.opponent_name(level);
        self.restore_slot(index, &prefix, checkpoint, source)
    }

    /// Restore the super agent from `checkpoint`.
    pub fn restore_super_agent(&mut self, checkpoint: &Checkpoint, source: &str) -> Result<usize> {
        let index = self.layout.super_agent_index();
        let prefix = self.layout.super_agent_name();
        self.restore_slot(index, &prefix, checkpoint, source)
    }

    fn restore_slot(
        &mut self,
        index: usize,
        prefix: &str,
        checkpoint: &Checkpoint,
        source: &str,
    ) -> Result<usize> {
        let variables = checkpoint.with_prefix(prefix);
        if variables.is_empty() {
            return Err(Error::MissingVariables {
                path: source.to_string(),
                prefix: prefix.to_string(),
            });
        }
        self.trainers[index].restore_variables(&variables)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        roles::Role,
        types::{Action, Transition, UpdateLoss},
    };

    struct NamedTrainer {
        name: String,
        weight: f64,
    }

    impl Trainer for NamedTrainer {
        fn name(&self) -> &str {
            &self.name
        }

        fn action(&mut self, _observation: &[f64]) -> Result<Action> {
            Ok(vec![self.weight])
        }

        fn policy_action(&self, _observation: &[f64]) -> Action {
            vec![self.weight]
        }

        fn experience(&mut self, _transition: Transition) {}

        fn update(&mut self, _peers: &[&dyn Trainer], _step: u64) -> Result<Option<UpdateLoss>> {
            Ok(None)
        }

        fn variables(&self) -> BTreeMap<String, Vec<f64>> {
            BTreeMap::from([(format!("{}/w", self.name), vec![self.weight])])
        }

        fn restore_variables(&mut self, variables: &BTreeMap<String, Vec<f64>>) -> Result<usize> {
            if let Some(values) = variables.get(&format!("{}/w", self.name)) {
                self.weight = values[0];
                return Ok(1);
            }
            Ok(0)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn named_factory(spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        Ok(Box::new(NamedTrainer {
            name: spec.name.clone(),
            weight: 0.0,
        }))
    }

    #[test]
    fn test_roster_sizes_and_single_trainable_slot() {
        for max_level in 0..4 {
            for role in [Role::Defender, Role::Attacker] {
                let layout = RoleLayout::new(role, max_level);
                let roster = build_roster(layout, &named_factory).unwrap();
                assert_eq!(roster.len(), max_level + 2);

                let trainable: Vec<_> = roster.specs().iter().filter(|s| s.trainable).collect();
                assert_eq!(trainable.len(), 1);
                assert_eq!(trainable[0].role, role);
                assert_eq!(
                    roster.specs()[layout.super_agent_index()].name,
                    layout.super_agent_name()
                );
                for spec in roster.specs().iter().filter(|s| !s.trainable) {
                    assert_eq!(spec.role, role.opponent());
                }
            }
        }
    }

    #[test]
    fn test_opponents_are_in_level_order() {
        let roster = build_roster(RoleLayout::new(Role::Attacker, 2), &named_factory).unwrap();
        let names: Vec<_> = roster.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "super_attacker_0",
                "level_0_defender_1",
                "level_1_defender_1",
                "level_2_defender_1"
            ]
        );
    }

    #[test]
    fn test_restore_opponent_uses_scope_prefix() {
        let layout = RoleLayout::new(Role::Defender, 1);
        let mut roster = build_roster(layout, &named_factory).unwrap();

        let mut checkpoint = Checkpoint::new();
        checkpoint.extend([
            ("level_1_attacker_0/w".to_string(), vec![7.0]),
            ("level_0_attacker_0/w".to_string(), vec![3.0]),
        ]);

        assert_eq!(roster.restore_opponent(1, &checkpoint, "mem").unwrap(), 1);
        assert_eq!(roster.get(1).unwrap().policy_action(&[]), vec![7.0]);
        assert_eq!(roster.get(0).unwrap().policy_action(&[]), vec![0.0]);

        let err = roster
            .restore_super_agent(&checkpoint, "mem")
            .unwrap_err();
        assert!(matches!(err, Error::MissingVariables { .. }));
    }

    #[test]
    fn test_split_pair_returns_super_first() {
        let layout = RoleLayout::new(Role::Defender, 2);
        let mut roster = build_roster(layout, &named_factory).unwrap();
        let pair = MatchPair::new(layout.super_agent_index(), 1).unwrap();
        let (learner, opponent) = roster.split_pair(&pair);
        assert_eq!(learner.name(), "super_defender_1");
        assert_eq!(opponent.name(), "level_1_attacker_0");
    }

    #[test]
    fn test_factory_name_mismatch_is_rejected() {
        let factory = |_spec: &TrainerSpec| -> Result<Box<dyn Trainer>> {
            Ok(Box::new(NamedTrainer {
                name: "wrong".to_string(),
                weight: 0.0,
            }))
        };
        let result = build_roster(RoleLayout::new(Role::Defender, 0), &factory);
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    }
}
