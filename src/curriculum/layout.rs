//! Roster index layout for a training role

use serde::{Deserialize, Serialize};

use crate::{Error, Result, roles::Role};

/// Fixed mapping between opponent levels and roster indices.
///
/// With `max_level = K` the roster holds `K + 2` trainers:
/// - training a defender: attackers of level `0..=K` at indices `0..=K`, the
///   super defender at `K + 1`
/// - training an attacker: the super attacker at `0`, defenders of level
///   `0..=K` at indices `1..=K + 1`
///
/// Either way, sorting a (super, opponent) pair by roster index yields the
/// environment's agent order (attacker first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLayout {
    role: Role,
    max_level: usize,
}

impl RoleLayout {
    pub fn new(role: Role, max_level: usize) -> Self {
        Self { role, max_level }
    }

    /// Role of the super agent
    pub fn role(&self) -> Role {
        self.role
    }

    /// Role of every opponent in the ladder
    pub fn opponent_role(&self) -> Role {
        self.role.opponent()
    }

    /// Highest opponent level `K`
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Number of opponent levels, `K + 1`
    pub fn num_levels(&self) -> usize {
        self.max_level + 1
    }

    /// Total number of roster slots, `K + 2`
    pub fn roster_len(&self) -> usize {
        self.max_level + 2
    }

    /// Roster index of the trainable super agent.
    pub fn super_agent_index(&self) -> usize {
        match self.role {
            Role::Defender => self.max_level + 1,
            Role::Attacker => 0,
        }
    }

    /// Roster index of the opponent at `level`.
    pub fn opponent_index_for_level(&self, level: usize) -> Result<usize> {
        if level > self.max_level {
            return Err(Error::LevelOutOfRange {
                level,
                max_level: self.max_level,
            });
        }
        Ok(match self.role {
            Role::Defender => level,
            Role::Attacker => level + 1,
        })
    }

    /// Opponent level stored at roster `index`, `None` for the super agent.
    pub fn level_for_index(&self, index: usize) -> Option<usize> {
        if index >= self.roster_len() || index == self.super_agent_index() {
            return None;
        }
        Some(match self.role {
            Role::Defender => index,
            Role::Attacker => index - 1,
        })
    }

    /// Environment agent index of the super agent.
    pub fn super_env_index(&self) -> usize {
        self.role.env_index()
    }

    /// Environment agent index of every opponent.
    pub fn opponent_env_index(&self) -> usize {
        self.opponent_role().env_index()
    }

    /// Scoped trainer name for the opponent at `level`, e.g. `level_1_attacker_0`.
    pub fn opponent_name(&self, level: usize) -> String {
        format!(
            "level_{}_{}_{}",
            level,
            self.opponent_role().label(),
            self.opponent_env_index()
        )
    }

    /// Scoped trainer name for the super agent, e.g. `super_defender_1`.
    pub fn super_agent_name(&self) -> String {
        format!("super_{}_{}", self.role.label(), self.super_env_index())
    }

    /// File stem holding the trained network of the opponent at `level`.
    pub fn opponent_checkpoint_stem(&self, level: usize) -> String {
        format!("level_{}_{}", level, self.opponent_role().label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defender_layout() {
        let layout = RoleLayout::new(Role::Defender, 3);
        assert_eq!(layout.roster_len(), 5);
        assert_eq!(layout.super_agent_index(), 4);
        for level in 0..=3 {
            assert_eq!(layout.opponent_index_for_level(level).unwrap(), level);
            assert_eq!(layout.level_for_index(level), Some(level));
        }
        assert_eq!(layout.level_for_index(4), None);
        assert_eq!(layout.opponent_name(2), "level_2_attacker_0");
        assert_eq!(layout.super_agent_name(), "super_defender_1");
    }

    #[test]
    fn test_attacker_layout() {
        let layout = RoleLayout::new(Role::Attacker, 2);
        assert_eq!(layout.super_agent_index(), 0);
        assert_eq!(layout.opponent_index_for_level(0).unwrap(), 1);
        assert_eq!(layout.opponent_index_for_level(2).unwrap(), 3);
        assert_eq!(layout.level_for_index(0), None);
        assert_eq!(layout.level_for_index(3), Some(2));
        assert_eq!(layout.opponent_name(0), "level_0_defender_1");
        assert_eq!(layout.super_agent_name(), "super_attacker_0");
        assert_eq!(layout.opponent_checkpoint_stem(1), "level_1_defender");
    }

    #[test]
    fn test_level_out_of_range() {
        let layout = RoleLayout::new(Role::Defender, 1);
        assert!(matches!(
            layout.opponent_index_for_level(2),
            Err(Error::LevelOutOfRange {
                level: 2,
                max_level: 1
            })
        ));
    }
}
