//! Pairing the super agent with the sampled opponent

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The two roster slots that interact during one environment step.
///
/// Indices are kept in ascending roster order, which is also the environment's
/// agent order, so `indices()[k]` acts on observation `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    super_index: usize,
    opponent_index: usize,
}

impl MatchPair {
    /// Pair the super agent with an opponent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegeneratePair`] if both indices are equal. Defender and
    /// attacker slots are disjoint by construction, so this is always a bug.
    pub fn new(super_index: usize, opponent_index: usize) -> Result<Self> {
        if super_index == opponent_index {
            return Err(Error::DegeneratePair { index: super_index });
        }
        Ok(Self {
            super_index,
            opponent_index,
        })
    }

    pub fn super_index(&self) -> usize {
        self.super_index
    }

    pub fn opponent_index(&self) -> usize {
        self.opponent_index
    }

    /// Both roster indices, ascending.
    pub fn indices(&self) -> [usize; 2] {
        if self.super_index < self.opponent_index {
            [self.super_index, self.opponent_index]
        } else {
            [self.opponent_index, self.super_index]
        }
    }

    /// Position of the super agent within `indices()`.
    pub fn super_position(&self) -> usize {
        usize::from(self.super_index > self.opponent_index)
    }

    /// Whether roster `index` takes part in this step.
    pub fn contains(&self, index: usize) -> bool {
        index == self.super_index || index == self.opponent_index
    }
}
