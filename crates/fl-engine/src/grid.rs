//! Grid representation and generation policies

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::symbols::{SymbolPool, SymbolTable};

/// Grid rows (fixed 3×3 layout across all variants)
pub const GRID_ROWS: usize = 3;
/// Grid columns
pub const GRID_COLS: usize = 3;

/// A 3×3 matrix of symbol table indices, generated fresh per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub cells: [[u8; GRID_COLS]; GRID_ROWS],
}

impl Grid {
    /// Symbol index at (row, col)
    pub fn at(&self, row: u8, col: u8) -> u8 {
        self.cells[row as usize][col as usize]
    }

    /// Iterate all nine cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells.iter().flat_map(|row| row.iter().copied())
    }
}

/// Cell-generation policy for one round.
///
/// Selected externally (normally by the bonus state machine); the
/// generator itself is stateless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Every cell is an independent weighted draw
    Standard,
    /// Middle column forced to the wild symbol, side columns drawn
    WildColumn,
}

/// Produces grids from a symbol pool under a [`GridMode`].
///
/// Construction fails if the variant would ever request a wild column
/// without a wild symbol; after that, generation never fails.
#[derive(Debug, Clone)]
pub struct GridGenerator {
    pool: SymbolPool,
    wild: Option<u8>,
}

impl GridGenerator {
    /// Build a generator for a table.
    ///
    /// `needs_wild_column` declares whether any configured mode can be
    /// [`GridMode::WildColumn`], so the missing-wild case is caught here
    /// rather than mid-round.
    pub fn new(table: &SymbolTable, needs_wild_column: bool) -> Result<Self, EngineError> {
        let pool = SymbolPool::new(table)?;
        let wild = table.wild_index();
        if needs_wild_column && wild.is_none() {
            return Err(EngineError::WildColumnWithoutWild);
        }
        Ok(Self { pool, wild })
    }

    /// Generate one grid under the given mode
    pub fn generate<R: Rng + ?Sized>(&self, mode: GridMode, rng: &mut R) -> Grid {
        let mut cells = [[0u8; GRID_COLS]; GRID_ROWS];
        for row in cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell = self.pool.draw(rng);
            }
        }
        if mode == GridMode::WildColumn {
            // Validated at construction: wild column mode implies a wild.
            let wild = self.wild.unwrap_or_default();
            for row in cells.iter_mut() {
                row[GRID_COLS / 2] = wild;
            }
        }
        Grid { cells }
    }
}
