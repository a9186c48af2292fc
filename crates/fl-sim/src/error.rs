//! Simulation-layer errors

use fl_engine::EngineError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("RTP is undefined: total wagered is zero")]
    UndefinedRtp,

    #[error("batch requires at least one session")]
    EmptyBatch,

    #[error("calibration requires a trial budget of at least one")]
    EmptyTrialBudget,

    #[error("funding parameter '{name}' must be positive, got {value}")]
    NonPositiveFunding { name: &'static str, value: f64 },

    #[error("cashback rate must be within (0, 1], got {0}")]
    InvalidCashbackRate(f64),
}
