//! Opponent-level distribution and categorical sampling

use rand::{
    Rng, SeedableRng,
    distr::{Distribution, weighted::WeightedIndex},
    rngs::StdRng,
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    curriculum::{layout::RoleLayout, matching::MatchPair},
};

/// Unnormalized sampling weights over opponent levels `0..=K`.
///
/// Only relative weights matter; the vector is never renormalized in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentDistribution {
    weights: Vec<f64>,
}

impl OpponentDistribution {
    /// Uniform weights over `num_levels` levels.
    pub fn uniform(num_levels: usize) -> Self {
        let weight = if num_levels == 0 {
            0.0
        } else {
            1.0 / num_levels as f64
        };
        Self {
            weights: vec![weight; num_levels],
        }
    }

    /// Build from explicit weights.
    ///
    /// # Errors
    ///
    /// Fails if any weight is negative or non-finite, or if all are zero.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self> {
        let distribution = Self { weights };
        distribution.validate()?;
        Ok(distribution)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Put all mass on `level`.
    pub fn set_one_hot(&mut self, level: usize) {
        self.weights.iter_mut().for_each(|weight| *weight = 0.0);
        self.weights[level] = 1.0;
    }

    /// Overwrite the weight of a single level, leaving the others alone.
    pub fn set_weight(&mut self, level: usize, weight: f64) {
        self.weights[level] = weight;
    }

    /// Normalized probabilities, for reporting.
    pub fn probabilities(&self) -> Vec<f64> {
        let total: f64 = self.weights.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.weights.len()];
        }
        self.weights.iter().map(|weight| weight / total).collect()
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidDistribution {
            weights: self.weights.clone(),
            reason: reason.to_string(),
        };
        if self.weights.is_empty() {
            return Err(invalid("no levels"));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("weights must be finite and non-negative"));
        }
        if self.weights.iter().sum::<f64>() <= 0.0 {
            return Err(invalid("weights sum to zero"));
        }
        Ok(())
    }

    /// Draw one level according to the current weights.
    pub fn sample_level<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        self.validate()?;
        let index = WeightedIndex::new(&self.weights).map_err(|e| Error::InvalidDistribution {
            weights: self.weights.clone(),
            reason: e.to_string(),
        })?;
        Ok(index.sample(rng))
    }
}

/// One draw from the sampler: the opponent level and both roster indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpponentSample {
    pub level: usize,
    pub opponent_index: usize,
    pub super_index: usize,
}

impl OpponentSample {
    /// Ordered interacting pair for this draw.
    pub fn pair(&self) -> Result<MatchPair> {
        MatchPair::new(self.super_index, self.opponent_index)
    }
}

/// Samples an opponent level and maps it onto the roster.
pub struct OpponentSampler {
    layout: RoleLayout,
    rng: StdRng,
}

impl OpponentSampler {
    /// Create a sampler; `seed = None` draws a seed from the OS.
    pub fn new(layout: RoleLayout, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random::<u64>()),
        };
        Self { layout, rng }
    }

    pub fn layout(&self) -> &RoleLayout {
        &self.layout
    }

    /// Draw a level from `distribution` and resolve its roster indices.
    pub fn sample(&mut self, distribution: &OpponentDistribution) -> Result<OpponentSample> {
        if distribution.len() != self.layout.num_levels() {
            return Err(Error::config(format!(
                "distribution has {} levels, roster has {}",
                distribution.len(),
                self.layout.num_levels()
            )));
        }
        let level = distribution.sample_level(&mut self.rng)?;
        Ok(OpponentSample {
            level,
            opponent_index: self.layout.opponent_index_for_level(level)?,
            super_index: self.layout.super_agent_index(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    #[test]
    fn test_uniform_distribution() {
        let distribution = OpponentDistribution::uniform(4);
        assert_eq!(distribution.weights(), &[0.25; 4]);
    }

    #[test]
    fn test_one_hot_always_selects_level() {
        let layout = RoleLayout::new(Role::Defender, 3);
        let mut sampler = OpponentSampler::new(layout, Some(7));
        let mut distribution = OpponentDistribution::uniform(4);
        distribution.set_one_hot(2);

        for _ in 0..50 {
            let sample = sampler.sample(&distribution).unwrap();
            assert_eq!(sample.level, 2);
            assert_eq!(sample.opponent_index, 2);
            assert_eq!(sample.super_index, 4);
        }
    }

    #[test]
    fn test_index_ranges_per_role() {
        for role in [Role::Defender, Role::Attacker] {
            let layout = RoleLayout::new(role, 3);
            let mut sampler = OpponentSampler::new(layout, Some(11));
            let distribution = OpponentDistribution::uniform(4);
            for _ in 0..200 {
                let sample = sampler.sample(&distribution).unwrap();
                let pair = sample.pair().unwrap();
                assert_ne!(pair.indices()[0], pair.indices()[1]);
                match role {
                    Role::Defender => {
                        assert!(sample.opponent_index <= 3);
                        assert_eq!(sample.super_index, 4);
                    }
                    Role::Attacker => {
                        assert!((1..=4).contains(&sample.opponent_index));
                        assert_eq!(sample.super_index, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unnormalized_weights_are_accepted() {
        let distribution = OpponentDistribution::from_weights(vec![0.0, 5.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(distribution.sample_level(&mut rng).unwrap(), 1);
        }
        assert_eq!(distribution.probabilities(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_zero_weights_are_rejected() {
        assert!(matches!(
            OpponentDistribution::from_weights(vec![0.0, 0.0]),
            Err(Error::InvalidDistribution { .. })
        ));
        assert!(OpponentDistribution::from_weights(vec![-1.0, 2.0]).is_err());
    }

    #[test]
    fn test_same_seed_same_levels() {
        let layout = RoleLayout::new(Role::Attacker, 4);
        let distribution = OpponentDistribution::uniform(5);
        let draw = |seed| {
            let mut sampler = OpponentSampler::new(layout, Some(seed));
            (0..30)
                .map(|_| sampler.sample(&distribution).unwrap().level)
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(99), draw(99));
    }
}
