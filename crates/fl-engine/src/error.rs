//! Engine configuration and runtime errors

/// Errors raised while validating or running a variant configuration.
///
/// All configuration problems surface at construction time; once a
/// [`crate::SlotMachine`] is built, round execution cannot fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("symbol table is empty")]
    EmptySymbolTable,

    #[error("symbol table has zero total weight")]
    ZeroTotalWeight,

    #[error("symbol '{0}' has a zero payout multiplier")]
    ZeroMultiplier(String),

    #[error("symbol table declares more than one wild symbol")]
    MultipleWilds,

    #[error("payline set is empty")]
    EmptyPaylineSet,

    #[error("payline {0} references cell ({1}, {2}) outside the 3x3 grid")]
    PaylineOutOfBounds(usize, u8, u8),

    #[error("wager must be positive, got {0}")]
    NonPositiveWager(f64),

    #[error("probability '{name}' must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("cylinder multiplier set has zero total weight")]
    ZeroCylinderWeight,

    #[error("bonus duration must be at least one round")]
    ZeroBonusDuration,

    #[error("wild-column grid policy requires a wild symbol in the table")]
    WildColumnWithoutWild,

    #[error("jackpot rule requires a wild symbol in the table")]
    JackpotWithoutWild,

    #[error("grid bonus factor must be at least 1")]
    ZeroGridBonusFactor,

    #[error("wager increment must be positive, got {0}")]
    NonPositiveWagerIncrement(f64),
}
