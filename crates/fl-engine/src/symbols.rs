//! Symbol definitions and the weighted draw pool

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A symbol definition.
///
/// Immutable per configuration: payout multiplier, draw weight and wild
/// flag never change mid-session. A weight of 0 keeps the symbol in the
/// table (so paylines can still pay it through wild substitution) but it
/// is never drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Display name (e.g. "tiger", "trophy")
    pub name: String,
    /// Payout multiplier applied per winning line
    pub multiplier: u32,
    /// Base draw weight
    pub weight: u32,
    /// Substitutes for any symbol in payline matching
    #[serde(default)]
    pub wild: bool,
}

impl Symbol {
    /// Create a regular paying symbol
    pub fn regular(name: impl Into<String>, multiplier: u32, weight: u32) -> Self {
        Self {
            name: name.into(),
            multiplier,
            weight,
            wild: false,
        }
    }

    /// Create the wild symbol
    pub fn wild(name: impl Into<String>, multiplier: u32, weight: u32) -> Self {
        Self {
            name: name.into(),
            multiplier,
            weight,
            wild: true,
        }
    }
}

/// Ordered symbol collection for one game variant.
///
/// Cells and line wins refer to symbols by table index, so the order is
/// part of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Validate and build a table.
    ///
    /// Fails fast on an empty table, zero total weight, a zero payout
    /// multiplier, or more than one wild.
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, EngineError> {
        if symbols.is_empty() {
            return Err(EngineError::EmptySymbolTable);
        }
        if symbols.iter().map(|s| s.weight as u64).sum::<u64>() == 0 {
            return Err(EngineError::ZeroTotalWeight);
        }
        if let Some(s) = symbols.iter().find(|s| s.multiplier == 0) {
            return Err(EngineError::ZeroMultiplier(s.name.clone()));
        }
        if symbols.iter().filter(|s| s.wild).count() > 1 {
            return Err(EngineError::MultipleWilds);
        }
        Ok(Self { symbols })
    }

    /// Symbol at a table index, `None` when out of range
    pub fn get(&self, index: u8) -> Option<&Symbol> {
        self.symbols.get(index as usize)
    }

    /// All symbols in table order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if empty (never true for a validated table)
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index of the wild symbol, if the variant has one
    pub fn wild_index(&self) -> Option<u8> {
        self.symbols.iter().position(|s| s.wild).map(|i| i as u8)
    }

    /// Sum of all draw weights
    pub fn total_weight(&self) -> u64 {
        self.symbols.iter().map(|s| s.weight as u64).sum()
    }
}

/// Weighted random draw of symbol indices.
///
/// The pool is immutable after construction; reweighting between sessions
/// means building a new pool from an updated table.
#[derive(Debug, Clone)]
pub struct SymbolPool {
    dist: WeightedIndex<u32>,
}

impl SymbolPool {
    /// Build the draw distribution for a table
    pub fn new(table: &SymbolTable) -> Result<Self, EngineError> {
        let dist = WeightedIndex::new(table.symbols().iter().map(|s| s.weight))
            .map_err(|_| EngineError::ZeroTotalWeight)?;
        Ok(Self { dist })
    }

    /// Draw one symbol index with probability proportional to weight
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        self.dist.sample(rng) as u8
    }

    /// Draw an independent `rows × cols` matrix of symbol indices
    pub fn draw_grid<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Vec<Vec<u8>> {
        (0..rows)
            .map(|_| (0..cols).map(|_| self.draw(rng)).collect())
            .collect()
    }
}
