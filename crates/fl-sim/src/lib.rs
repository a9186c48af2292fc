//! # fl-sim — Monte Carlo simulation and calibration
//!
//! Drives [`fl_engine`] machines at scale:
//!
//! - [`WagerSession`]: one simulated player under a funding model and
//!   stopping policy, round by round.
//! - [`run_batch`]: many independent sessions on a rayon worker pool,
//!   merged into an [`AggregateResult`].
//! - [`Calibrator`]: randomized search over symbol weights and auxiliary
//!   probabilities toward a target RTP.
//!
//! Every session and trial owns a private ChaCha stream derived from the
//! batch seed and its index, so results are reproducible and workers never
//! contaminate each other.

pub mod batch;
pub mod calibrate;
pub mod error;
pub mod funding;
pub mod session;
pub mod stats;

pub use batch::*;
pub use calibrate::*;
pub use error::*;
pub use funding::*;
pub use session::*;
pub use stats::*;
