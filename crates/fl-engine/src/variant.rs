//! Per-variant configuration objects
//!
//! A variant is pure data: symbol table, paylines, round-multiplier
//! policy, optional jackpot and bonus policies. The three presets mirror
//! the themed games this engine consolidates.

use serde::{Deserialize, Serialize};

use crate::bonus::{BonusExit, BonusPolicy};
use crate::error::EngineError;
use crate::grid::GridMode;
use crate::multiplier::{Cylinder, MultiplierPolicy};
use crate::paytable::{standard_paylines, JackpotRule, Payline};
use crate::symbols::{Symbol, SymbolTable};

/// Complete configuration for one game variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Variant name for logs and reports
    pub name: String,
    /// Ordered symbol definitions
    pub symbols: Vec<Symbol>,
    /// Active paylines
    pub paylines: Vec<Payline>,
    /// Round-multiplier policy
    pub multiplier: MultiplierPolicy,
    /// All-wild jackpot override, if the variant has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jackpot: Option<JackpotRule>,
    /// Feature-mode policy, if the variant has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<BonusPolicy>,
    /// Smallest valid wager step (used when funding models round wagers)
    pub wager_increment: f64,
}

impl VariantConfig {
    /// Validate the whole configuration and build the symbol table.
    ///
    /// Everything that could fail mid-run is rejected here instead.
    pub fn validate(&self) -> Result<SymbolTable, EngineError> {
        let table = SymbolTable::new(self.symbols.clone())?;
        self.multiplier.validate()?;
        if let Some(ref bonus) = self.bonus {
            bonus.validate()?;
            if bonus.active_grid == GridMode::WildColumn && table.wild_index().is_none() {
                return Err(EngineError::WildColumnWithoutWild);
            }
        }
        if self.jackpot.is_some() && table.wild_index().is_none() {
            return Err(EngineError::JackpotWithoutWild);
        }
        if self.paylines.is_empty() {
            return Err(EngineError::EmptyPaylineSet);
        }
        if self.wager_increment <= 0.0 {
            return Err(EngineError::NonPositiveWagerIncrement(self.wager_increment));
        }
        Ok(table)
    }

    /// Whether any configured mode can request a wild column
    pub fn needs_wild_column(&self) -> bool {
        self.bonus
            .as_ref()
            .is_some_and(|b| b.active_grid == GridMode::WildColumn)
    }

    /// Serialize to pretty JSON (for persisting calibrated configs)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// "Tiger" variant: wild with uniform-grid ×10 bonus, no feature mode.
    pub fn tiger() -> Self {
        Self {
            name: "tiger".into(),
            symbols: vec![
                Symbol::wild("tiger", 250, 1),
                Symbol::regular("trophy", 100, 2),
                Symbol::regular("orange", 25, 5),
                Symbol::regular("key", 10, 4),
                Symbol::regular("moneybag", 8, 7),
                Symbol::regular("envelope", 5, 12),
                Symbol::regular("telescope", 3, 44),
            ],
            paylines: standard_paylines(),
            multiplier: MultiplierPolicy::UniformGridBonus { factor: 10 },
            jackpot: None,
            bonus: None,
            wager_increment: 0.5,
        }
    }

    /// "Dragon" variant: cylinder multiplier with an 8-round fortune mode
    /// entered at 3% per idle round.
    pub fn dragon() -> Self {
        Self {
            name: "dragon".into(),
            symbols: vec![
                Symbol::wild("dragon", 100, 1),
                Symbol::regular("trophy", 50, 2),
                Symbol::regular("orange", 25, 8),
                Symbol::regular("key", 10, 20),
                Symbol::regular("moneybag", 5, 30),
                Symbol::regular("envelope", 3, 39),
                Symbol::regular("telescope", 2, 61),
            ],
            paylines: standard_paylines(),
            multiplier: MultiplierPolicy::Cylinder {
                base: Cylinder::from_pairs(&[(1, 10), (2, 24), (5, 15), (10, 4)]),
                feature: Cylinder::from_pairs(&[(1, 0), (2, 12), (5, 5), (10, 3)]),
                third_spin_chance: 0.21,
            },
            jackpot: None,
            bonus: Some(BonusPolicy {
                entry_probability: 0.03,
                exit: BonusExit::AfterRounds(8),
                active_grid: GridMode::Standard,
            }),
            wager_increment: 0.5,
        }
    }

    /// "Mouse" variant: wild-column feature mode ending on the first win,
    /// plus the all-wild 1000× jackpot override.
    pub fn mouse() -> Self {
        Self {
            name: "mouse".into(),
            symbols: vec![
                Symbol::wild("mouse", 300, 5),
                Symbol::regular("trophy", 100, 2),
                Symbol::regular("orange", 50, 5),
                Symbol::regular("key", 30, 5),
                Symbol::regular("moneybag", 15, 6),
                Symbol::regular("envelope", 5, 55),
                Symbol::regular("telescope", 3, 92),
            ],
            paylines: standard_paylines(),
            multiplier: MultiplierPolicy::Flat,
            jackpot: Some(JackpotRule { multiplier: 1000 }),
            bonus: Some(BonusPolicy {
                entry_probability: 0.1,
                exit: BonusExit::OnFirstWin,
                active_grid: GridMode::WildColumn,
            }),
            wager_increment: 0.5,
        }
    }

    /// Preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "tiger" => Some(Self::tiger()),
            "dragon" => Some(Self::dragon()),
            "mouse" => Some(Self::mouse()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for name in ["tiger", "dragon", "mouse"] {
            let variant = VariantConfig::preset(name).unwrap();
            variant.validate().unwrap();
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(VariantConfig::preset("walrus").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let variant = VariantConfig::dragon();
        let json = variant.to_json().unwrap();
        assert!(!json.is_empty());
        let parsed = VariantConfig::from_json(&json).unwrap();
        assert_eq!(parsed, variant);
    }

    #[test]
    fn test_wild_column_without_wild_rejected() {
        let mut variant = VariantConfig::mouse();
        for symbol in &mut variant.symbols {
            symbol.wild = false;
        }
        variant.jackpot = None;
        assert_eq!(
            variant.validate().unwrap_err(),
            EngineError::WildColumnWithoutWild
        );
    }
}
