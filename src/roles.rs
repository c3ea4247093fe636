//! Agent roles in the attacker/defender game

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Side an agent plays on.
///
/// The environment places the attacker at agent index 0 and the defender at
/// agent index 1; every other index computation in the crate derives from that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Protects the target; the "good" agent
    Defender,
    /// Tries to reach the target; the adversary
    Attacker,
}

impl Role {
    /// The role on the other side of the match.
    pub fn opponent(&self) -> Role {
        match self {
            Role::Defender => Role::Attacker,
            Role::Attacker => Role::Defender,
        }
    }

    /// Index of this role's agent inside the environment.
    pub fn env_index(&self) -> usize {
        match self {
            Role::Attacker => 0,
            Role::Defender => 1,
        }
    }

    /// Trainer tag used by the underlying algorithm.
    pub fn tag(&self) -> RoleTag {
        match self {
            Role::Attacker => RoleTag::Adversary,
            Role::Defender => RoleTag::Agent,
        }
    }

    /// Short lowercase label, as used in trainer names and file names.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Defender => "defender",
            Role::Attacker => "attacker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defender" => Ok(Role::Defender),
            "attacker" => Ok(Role::Attacker),
            _ => Err(Error::UnknownRole {
                role: s.to_string(),
            }),
        }
    }
}

/// Algorithm-level tag attached to each trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleTag {
    /// Good agent
    Agent,
    /// Adversary
    Adversary,
}

impl RoleTag {
    /// Lowercase label
    pub fn label(&self) -> &'static str {
        match self {
            RoleTag::Agent => "agent",
            RoleTag::Adversary => "adversary",
        }
    }
}
