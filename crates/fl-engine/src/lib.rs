//! # fl-engine — Weighted-reel slot engine
//!
//! One engine for a family of 3×3 themed slot variants. Each variant is a
//! [`VariantConfig`] data object (symbol table, paylines, round-multiplier
//! policy, bonus policy); the engine itself carries no per-theme logic.
//!
//! ## Architecture
//!
//! ```text
//! VariantConfig
//!     │
//!     ├── SymbolTable / SymbolPool (weighted draws)
//!     ├── GridGenerator (random vs. wild-column policy)
//!     ├── PaylineEvaluator (wild substitution, grid bonus, jackpot)
//!     └── BonusStateMachine (entry trial, duration / win-triggered exit)
//!           │
//!           v
//!     SlotMachine::play_round → RoundOutcome
//! ```
//!
//! All randomness flows through caller-seedable ChaCha streams so every
//! round sequence is reproducible.

pub mod bonus;
pub mod error;
pub mod grid;
pub mod machine;
pub mod multiplier;
pub mod paytable;
pub mod symbols;
pub mod variant;

pub use bonus::*;
pub use error::*;
pub use grid::*;
pub use machine::*;
pub use multiplier::*;
pub use paytable::*;
pub use symbols::*;
pub use variant::*;
