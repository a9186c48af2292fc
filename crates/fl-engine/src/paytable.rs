//! Paylines and win evaluation

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::grid::{Grid, GRID_COLS, GRID_ROWS};
use crate::symbols::SymbolTable;

/// A payline: an ordered triple of (row, col) grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payline(pub [(u8, u8); 3]);

/// The standard 5-line set shared by all variants:
/// three rows plus the two diagonals.
pub fn standard_paylines() -> Vec<Payline> {
    vec![
        Payline([(0, 0), (0, 1), (0, 2)]),
        Payline([(1, 0), (1, 1), (1, 2)]),
        Payline([(2, 0), (2, 1), (2, 2)]),
        Payline([(0, 0), (1, 1), (2, 2)]),
        Payline([(2, 0), (1, 1), (0, 2)]),
    ]
}

/// All-wild jackpot override: a flat payout replacing line scoring when
/// every cell on the grid is the wild symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotRule {
    /// Payout = `multiplier × wager_per_line`
    pub multiplier: u32,
}

/// A win on a single payline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWin {
    /// Index into the variant's payline set
    pub line_index: u8,
    /// Winning symbol (table index); the wild itself when the line is
    /// all-wild
    pub symbol: u8,
    /// Amount credited for this line
    pub amount: f64,
}

/// Result of scoring one grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPayout {
    /// Line wins, empty on the (common) losing round
    pub line_wins: Vec<LineWin>,
    /// Total credited amount, always ≥ 0
    pub total: f64,
    /// Effective multiplier applied to every line this round
    /// (round multiplier × uniform-grid bonus)
    pub multiplier: u32,
    /// All-wild jackpot override fired
    pub jackpot: bool,
    /// Uniform-grid bonus applied
    pub grid_bonus: bool,
}

impl RoundPayout {
    pub fn is_win(&self) -> bool {
        self.total > 0.0
    }
}

/// Scores grids against a fixed payline set with wild substitution,
/// optional uniform-grid bonus and optional all-wild jackpot override.
#[derive(Debug, Clone)]
pub struct PaylineEvaluator {
    table: SymbolTable,
    paylines: Vec<Payline>,
    wild: Option<u8>,
    grid_bonus_factor: Option<u32>,
    jackpot: Option<JackpotRule>,
}

impl PaylineEvaluator {
    pub fn new(
        table: SymbolTable,
        paylines: Vec<Payline>,
        grid_bonus_factor: Option<u32>,
        jackpot: Option<JackpotRule>,
    ) -> Result<Self, EngineError> {
        if paylines.is_empty() {
            return Err(EngineError::EmptyPaylineSet);
        }
        for (i, line) in paylines.iter().enumerate() {
            for &(row, col) in &line.0 {
                if row as usize >= GRID_ROWS || col as usize >= GRID_COLS {
                    return Err(EngineError::PaylineOutOfBounds(i, row, col));
                }
            }
        }
        if let Some(f) = grid_bonus_factor {
            if f == 0 {
                return Err(EngineError::ZeroGridBonusFactor);
            }
        }
        let wild = table.wild_index();
        if jackpot.is_some() && wild.is_none() {
            return Err(EngineError::JackpotWithoutWild);
        }
        Ok(Self {
            table,
            paylines,
            wild,
            grid_bonus_factor,
            jackpot,
        })
    }

    /// Number of active paylines
    pub fn line_count(&self) -> usize {
        self.paylines.len()
    }

    /// The variant's symbol table
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Score a grid.
    ///
    /// `round_multiplier` comes from the bonus state machine's multiplier
    /// draw (1 outside cylinder variants); the uniform-grid bonus factor
    /// is derived here from the grid itself.
    pub fn evaluate(&self, grid: &Grid, wager_per_line: f64, round_multiplier: u32) -> RoundPayout {
        // Jackpot override comes before any line scoring.
        if let (Some(rule), Some(wild)) = (self.jackpot, self.wild) {
            if grid.iter().all(|c| c == wild) {
                return RoundPayout {
                    line_wins: Vec::new(),
                    total: rule.multiplier as f64 * wager_per_line,
                    multiplier: round_multiplier,
                    jackpot: true,
                    grid_bonus: false,
                };
            }
        }

        let grid_bonus = self.uniform_grid_bonus(grid);
        let multiplier = round_multiplier * grid_bonus.unwrap_or(1);

        let mut line_wins = Vec::new();
        let mut total = 0.0;
        for (index, line) in self.paylines.iter().enumerate() {
            let Some(symbol) = self.winning_symbol(grid, line) else {
                continue;
            };
            // A cell outside the table can never pay; grids drawn from
            // this table's pool are always in range.
            let Some(paid) = self.table.get(symbol) else {
                continue;
            };
            let amount = wager_per_line * paid.multiplier as f64 * multiplier as f64;
            total += amount;
            line_wins.push(LineWin {
                line_index: index as u8,
                symbol,
                amount,
            });
        }

        RoundPayout {
            line_wins,
            total,
            multiplier,
            jackpot: false,
            grid_bonus: grid_bonus.is_some(),
        }
    }

    /// Winning symbol for a line, if any: ignore wilds; the remainder must
    /// be empty (pays the wild) or all equal (pays that symbol). Any other
    /// mix pays nothing — no partial credit.
    fn winning_symbol(&self, grid: &Grid, line: &Payline) -> Option<u8> {
        let cells = line.0.map(|(row, col)| grid.at(row, col));
        let mut non_wild = cells.iter().copied().filter(|&c| Some(c) != self.wild);

        match non_wild.next() {
            None => self.wild,
            Some(first) => non_wild.all(|c| c == first).then_some(first),
        }
    }

    /// Uniform-grid bonus factor if every non-wild cell shows the same
    /// symbol (an all-wild grid also qualifies).
    fn uniform_grid_bonus(&self, grid: &Grid) -> Option<u32> {
        let factor = self.grid_bonus_factor?;
        let mut non_wild = grid.iter().filter(|&c| Some(c) != self.wild);
        let uniform = match non_wild.next() {
            None => true,
            Some(first) => non_wild.all(|c| c == first),
        };
        uniform.then_some(factor)
    }
}
