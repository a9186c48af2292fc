//! Round-multiplier policies
//!
//! A variant's round multiplier is either flat, derived from the whole
//! grid (uniform-grid bonus), or drawn from a weighted "cylinder" of
//! discrete values with a richer draw during feature rounds.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One stop on the multiplier cylinder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CylinderStop {
    pub multiplier: u32,
    pub weight: u32,
}

/// A weighted set of discrete multiplier values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cylinder {
    pub stops: Vec<CylinderStop>,
}

impl Cylinder {
    /// Build from (multiplier, weight) pairs
    pub fn from_pairs(pairs: &[(u32, u32)]) -> Self {
        Self {
            stops: pairs
                .iter()
                .map(|&(multiplier, weight)| CylinderStop { multiplier, weight })
                .collect(),
        }
    }

    fn total_weight(&self) -> u64 {
        self.stops.iter().map(|s| s.weight as u64).sum()
    }
}

/// Round-multiplier policy, selected per variant via configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MultiplierPolicy {
    /// Every round pays at 1×
    Flat,
    /// If every non-wild symbol on the grid is identical (or absent),
    /// all line payouts are multiplied by `factor`
    UniformGridBonus { factor: u32 },
    /// Weighted cylinder draw; during feature rounds two draws are summed
    /// with a `third_spin_chance` probability of a third
    Cylinder {
        base: Cylinder,
        feature: Cylinder,
        third_spin_chance: f64,
    },
}

impl MultiplierPolicy {
    /// Fail fast on impossible cylinder or probability configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Self::UniformGridBonus { factor } = self {
            if *factor == 0 {
                return Err(EngineError::ZeroGridBonusFactor);
            }
        }
        if let Self::Cylinder {
            base,
            feature,
            third_spin_chance,
        } = self
        {
            if base.total_weight() == 0 || feature.total_weight() == 0 {
                return Err(EngineError::ZeroCylinderWeight);
            }
            if !(0.0..=1.0).contains(third_spin_chance) {
                return Err(EngineError::ProbabilityOutOfRange {
                    name: "third_spin_chance",
                    value: *third_spin_chance,
                });
            }
        }
        Ok(())
    }

    /// The uniform-grid factor, if that policy is active
    pub fn grid_bonus_factor(&self) -> Option<u32> {
        match self {
            Self::UniformGridBonus { factor } => Some(*factor),
            _ => None,
        }
    }
}

/// Pre-built sampler for one cylinder (distribution built once, not per
/// round — the calibrator runs hundreds of millions of rounds).
#[derive(Debug, Clone)]
struct CylinderSampler {
    values: Vec<u32>,
    dist: WeightedIndex<u32>,
}

impl CylinderSampler {
    fn new(cylinder: &Cylinder) -> Result<Self, EngineError> {
        let dist = WeightedIndex::new(cylinder.stops.iter().map(|s| s.weight))
            .map_err(|_| EngineError::ZeroCylinderWeight)?;
        Ok(Self {
            values: cylinder.stops.iter().map(|s| s.multiplier).collect(),
            dist,
        })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.values[self.dist.sample(rng)]
    }
}

/// Resolved per-round multiplier source for a running machine.
#[derive(Debug, Clone)]
pub(crate) enum MultiplierSampler {
    Fixed,
    Cylinder {
        base: CylinderSampler,
        feature: CylinderSampler,
        third_spin_chance: f64,
    },
}

impl MultiplierSampler {
    pub(crate) fn new(policy: &MultiplierPolicy) -> Result<Self, EngineError> {
        policy.validate()?;
        Ok(match policy {
            MultiplierPolicy::Flat | MultiplierPolicy::UniformGridBonus { .. } => Self::Fixed,
            MultiplierPolicy::Cylinder {
                base,
                feature,
                third_spin_chance,
            } => Self::Cylinder {
                base: CylinderSampler::new(base)?,
                feature: CylinderSampler::new(feature)?,
                third_spin_chance: *third_spin_chance,
            },
        })
    }

    /// Draw this round's multiplier. Feature rounds sum two draws and,
    /// with configured probability, a third.
    pub(crate) fn draw<R: Rng + ?Sized>(&self, feature_active: bool, rng: &mut R) -> u32 {
        match self {
            Self::Fixed => 1,
            Self::Cylinder {
                base,
                feature,
                third_spin_chance,
            } => {
                if feature_active {
                    let mut total = feature.draw(rng) + feature.draw(rng);
                    if rng.gen_bool(*third_spin_chance) {
                        total += feature.draw(rng);
                    }
                    total
                } else {
                    base.draw(rng)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn cylinder_policy() -> MultiplierPolicy {
        MultiplierPolicy::Cylinder {
            base: Cylinder::from_pairs(&[(1, 10), (2, 24), (5, 15), (10, 4)]),
            feature: Cylinder::from_pairs(&[(1, 0), (2, 12), (5, 5), (10, 3)]),
            third_spin_chance: 0.21,
        }
    }

    #[test]
    fn test_flat_policy_always_one() {
        let sampler = MultiplierSampler::new(&MultiplierPolicy::Flat).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(sampler.draw(false, &mut rng), 1);
        assert_eq!(sampler.draw(true, &mut rng), 1);
    }

    #[test]
    fn test_base_draw_within_cylinder_values() {
        let sampler = MultiplierSampler::new(&cylinder_policy()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            let m = sampler.draw(false, &mut rng);
            assert!([1, 2, 5, 10].contains(&m));
        }
    }

    #[test]
    fn test_feature_draw_sums_at_least_two() {
        let sampler = MultiplierSampler::new(&cylinder_policy()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            // Feature cylinder never lands on 1 (weight 0), so two draws
            // are at least 4, three at most 30.
            let m = sampler.draw(true, &mut rng);
            assert!((4..=30).contains(&m), "m = {m}");
        }
    }

    #[test]
    fn test_rejects_zero_cylinder_weight() {
        let policy = MultiplierPolicy::Cylinder {
            base: Cylinder::from_pairs(&[(1, 0)]),
            feature: Cylinder::from_pairs(&[(2, 1)]),
            third_spin_chance: 0.2,
        };
        assert_eq!(policy.validate(), Err(EngineError::ZeroCylinderWeight));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let policy = MultiplierPolicy::Cylinder {
            base: Cylinder::from_pairs(&[(1, 1)]),
            feature: Cylinder::from_pairs(&[(2, 1)]),
            third_spin_chance: 1.5,
        };
        assert!(matches!(
            policy.validate(),
            Err(EngineError::ProbabilityOutOfRange { .. })
        ));
    }
}
