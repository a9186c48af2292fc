//! Single-round machine
//!
//! Wires one variant's pool, generator, evaluator and bonus machine to a
//! private seedable random stream. This is the round-step interface used
//! by both the interactive loop and the batch simulators.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::bonus::{BonusState, BonusStateMachine};
use crate::error::EngineError;
use crate::grid::{Grid, GridGenerator};
use crate::multiplier::MultiplierSampler;
use crate::paytable::{LineWin, PaylineEvaluator};
use crate::variant::VariantConfig;

/// Outcome of one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// The generated grid
    pub grid: Grid,
    /// Total amount credited
    pub payout: f64,
    /// Effective multiplier applied to line wins
    pub multiplier: u32,
    /// Round ran under the feature mode
    pub feature_active: bool,
    /// All-wild jackpot fired
    pub jackpot: bool,
    /// Per-line wins
    pub line_wins: Vec<LineWin>,
}

/// One variant's machine with its private random stream.
///
/// Sessions own a machine each; nothing here is shared across workers.
pub struct SlotMachine {
    generator: GridGenerator,
    evaluator: PaylineEvaluator,
    bonus: BonusStateMachine,
    multiplier: MultiplierSampler,
    rng: ChaCha8Rng,
    rounds_played: u64,
}

impl SlotMachine {
    /// Build from a validated variant with a caller-supplied stream.
    ///
    /// Batch runners derive one stream per session index from a base seed
    /// so outcomes never cross worker boundaries.
    pub fn with_rng(variant: &VariantConfig, rng: ChaCha8Rng) -> Result<Self, EngineError> {
        let table = variant.validate()?;
        let generator = GridGenerator::new(&table, variant.needs_wild_column())?;
        let evaluator = PaylineEvaluator::new(
            table,
            variant.paylines.clone(),
            variant.multiplier.grid_bonus_factor(),
            variant.jackpot,
        )?;
        let bonus = BonusStateMachine::new(variant.bonus.clone())?;
        let multiplier = MultiplierSampler::new(&variant.multiplier)?;
        Ok(Self {
            generator,
            evaluator,
            bonus,
            multiplier,
            rng,
            rounds_played: 0,
        })
    }

    /// Build with a fixed seed (reproducible)
    pub fn new(variant: &VariantConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(variant, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build from OS entropy (interactive play)
    pub fn from_entropy(variant: &VariantConfig) -> Result<Self, EngineError> {
        Self::with_rng(variant, ChaCha8Rng::from_entropy())
    }

    /// Number of active paylines
    pub fn line_count(&self) -> usize {
        self.evaluator.line_count()
    }

    /// Current bonus state
    pub fn bonus_state(&self) -> BonusState {
        self.bonus.state()
    }

    /// Rounds played since construction
    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    /// Symbol name for a grid cell (rendering), `None` when the index is
    /// not in the variant's table
    pub fn symbol_name(&self, index: u8) -> Option<&str> {
        self.evaluator.table().get(index).map(|s| s.name.as_str())
    }

    /// Play one round for a total wager spread evenly across paylines.
    ///
    /// Round order: advance the bonus machine (entry trial applies to the
    /// current round), draw the round multiplier, generate the grid under
    /// the active mode's policy, score it, then settle the bonus exit.
    pub fn play_round(&mut self, wager: f64) -> Result<RoundOutcome, EngineError> {
        if wager <= 0.0 {
            return Err(EngineError::NonPositiveWager(wager));
        }
        let wager_per_line = wager / self.line_count() as f64;

        let mode = self.bonus.begin_round(&mut self.rng);
        let round_multiplier = self.multiplier.draw(mode.feature_active, &mut self.rng);
        let grid = self.generator.generate(mode.grid, &mut self.rng);
        let payout = self.evaluator.evaluate(&grid, wager_per_line, round_multiplier);
        self.bonus.end_round(payout.total);
        self.rounds_played += 1;

        Ok(RoundOutcome {
            grid,
            payout: payout.total,
            multiplier: payout.multiplier,
            feature_active: mode.feature_active,
            jackpot: payout.jackpot,
            line_wins: payout.line_wins,
        })
    }

    /// Borrow the RNG (used by funding models that draw session-level
    /// parameters from the same stream)
    pub fn rng_mut(&mut self) -> &mut impl Rng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VariantConfig;

    #[test]
    fn test_rounds_are_reproducible_per_seed() {
        let variant = VariantConfig::tiger();
        let mut a = SlotMachine::new(&variant, 99).unwrap();
        let mut b = SlotMachine::new(&variant, 99).unwrap();
        for _ in 0..50 {
            let ra = a.play_round(4.0).unwrap();
            let rb = b.play_round(4.0).unwrap();
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let variant = VariantConfig::tiger();
        let mut a = SlotMachine::new(&variant, 1).unwrap();
        let mut b = SlotMachine::new(&variant, 2).unwrap();
        let same = (0..50).all(|_| {
            a.play_round(4.0).unwrap().grid == b.play_round(4.0).unwrap().grid
        });
        assert!(!same);
    }

    #[test]
    fn test_symbol_name_bounds_checked() {
        let machine = SlotMachine::new(&VariantConfig::tiger(), 0).unwrap();
        assert_eq!(machine.symbol_name(0), Some("tiger"));
        assert_eq!(machine.symbol_name(200), None);
    }

    #[test]
    fn test_rejects_non_positive_wager() {
        let variant = VariantConfig::mouse();
        let mut machine = SlotMachine::new(&variant, 0).unwrap();
        assert!(matches!(
            machine.play_round(0.0),
            Err(EngineError::NonPositiveWager(_))
        ));
    }

    #[test]
    fn test_payout_non_negative_across_variants() {
        for name in ["tiger", "dragon", "mouse"] {
            let variant = VariantConfig::preset(name).unwrap();
            let mut machine = SlotMachine::new(&variant, 7).unwrap();
            for _ in 0..2000 {
                let outcome = machine.play_round(4.0).unwrap();
                assert!(outcome.payout >= 0.0);
            }
        }
    }

    #[test]
    fn test_mouse_feature_grid_has_wild_column() {
        let variant = VariantConfig::mouse();
        let mut machine = SlotMachine::new(&variant, 21).unwrap();
        let mut saw_feature = false;
        for _ in 0..500 {
            let outcome = machine.play_round(4.0).unwrap();
            if outcome.feature_active {
                saw_feature = true;
                for row in 0..3 {
                    assert_eq!(outcome.grid.at(row, 1), 0, "middle column must be wild");
                }
            }
        }
        assert!(saw_feature, "10% entry should fire within 500 rounds");
    }
}
