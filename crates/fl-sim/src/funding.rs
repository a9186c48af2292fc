//! Session funding models and stopping policy
//!
//! A funding model describes where a session's bankroll comes from and
//! what the player must wager before it counts as "cleared". Selecting a
//! model is configuration, not code branching: every model resolves to the
//! same [`FundingPlan`] shape consumed by the session loop.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// How a session's bankroll is funded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FundingModel {
    /// Plain player deposit
    Cash { deposit: f64 },

    /// Deposit plus a matched bonus:
    /// `bonus = min(deposit × (multiplier − 1), bonus_cap)`.
    ///
    /// `bonus_only_wagering` selects the rollover basis: the bonus amount
    /// alone, or the full bonus-inflated bankroll. The two promotions this
    /// models disagreed on the default, so the flag is mandatory.
    DepositBonus {
        deposit: f64,
        multiplier: f64,
        bonus_cap: f64,
        rollover: f64,
        bonus_only_wagering: bool,
    },

    /// Cashback credit only: `credit = min(deposit × rate, cap)`.
    ///
    /// The wager is fixed once per session as a uniform 10–20% fraction of
    /// the credit, rounded to the nearest wager increment. Rollover target
    /// is `credit × rollover_multiplier`.
    Cashback {
        deposit: f64,
        rate: f64,
        cap: f64,
        rollover_multiplier: f64,
    },

    /// A fixed batch of free spins at a fixed wager. Bankroll starts at
    /// zero and is never a stopping condition; the batch always runs to
    /// completion.
    FreeSpins { rounds: u64 },
}

/// A funding model resolved into the concrete numbers one session runs
/// under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingPlan {
    /// Starting bankroll
    pub bankroll: f64,
    /// Wager per round
    pub wager: f64,
    /// Stop once cumulative wagered reaches this
    pub rollover_target: Option<f64>,
    /// Stop after exactly this many rounds
    pub round_cap: Option<u64>,
    /// Whether an unaffordable wager ends the session
    /// (false only for free-spin batches)
    pub bankroll_is_stop: bool,
    /// When the bankroll cannot cover the fixed wager, wager the largest
    /// increment-multiple still covered instead of stopping (cashback)
    pub clamp_wager_to_bankroll: bool,
    /// Whether each wager is deducted from the bankroll. False for
    /// free-spin batches: the spins cost the player nothing, so the
    /// bankroll only accumulates winnings (wagers still count toward
    /// `total_wagered` for RTP).
    pub deduct_wager: bool,
    /// Reference amount profit is measured against (deposit or credit)
    pub reference: f64,
}

impl FundingModel {
    /// Resolve to a concrete plan.
    ///
    /// `wager` is the caller's wager-per-round (ignored by models that fix
    /// their own); `increment` is the variant's smallest wager step;
    /// `rng` draws session-level parameters (the cashback wager fraction).
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        wager: f64,
        increment: f64,
        rng: &mut R,
    ) -> Result<FundingPlan, SimError> {
        match *self {
            FundingModel::Cash { deposit } => {
                require_positive("deposit", deposit)?;
                require_positive("wager", wager)?;
                Ok(FundingPlan {
                    bankroll: deposit,
                    wager,
                    rollover_target: None,
                    round_cap: None,
                    bankroll_is_stop: true,
                    clamp_wager_to_bankroll: false,
                    deduct_wager: true,
                    reference: deposit,
                })
            }
            FundingModel::DepositBonus {
                deposit,
                multiplier,
                bonus_cap,
                rollover,
                bonus_only_wagering,
            } => {
                require_positive("deposit", deposit)?;
                require_positive("wager", wager)?;
                require_positive("rollover", rollover)?;
                if multiplier < 1.0 {
                    return Err(SimError::NonPositiveFunding {
                        name: "multiplier",
                        value: multiplier,
                    });
                }
                let bonus = (deposit * (multiplier - 1.0)).min(bonus_cap);
                let bankroll = deposit + bonus;
                let basis = if bonus_only_wagering { bonus } else { bankroll };
                Ok(FundingPlan {
                    bankroll,
                    wager,
                    rollover_target: Some(rollover * basis),
                    round_cap: None,
                    bankroll_is_stop: true,
                    clamp_wager_to_bankroll: false,
                    deduct_wager: true,
                    reference: deposit,
                })
            }
            FundingModel::Cashback {
                deposit,
                rate,
                cap,
                rollover_multiplier,
            } => {
                require_positive("deposit", deposit)?;
                require_positive("rollover_multiplier", rollover_multiplier)?;
                if !(0.0..=1.0).contains(&rate) || rate == 0.0 {
                    return Err(SimError::InvalidCashbackRate(rate));
                }
                let credit = (deposit * rate).min(cap);
                let fraction = rng.gen_range(0.10..=0.20);
                let wager = round_to_increment(fraction * credit, increment).max(increment);
                Ok(FundingPlan {
                    bankroll: credit,
                    wager,
                    rollover_target: Some(credit * rollover_multiplier),
                    round_cap: None,
                    bankroll_is_stop: true,
                    clamp_wager_to_bankroll: true,
                    deduct_wager: true,
                    reference: credit,
                })
            }
            FundingModel::FreeSpins { rounds } => {
                require_positive("wager", wager)?;
                require_positive("rounds", rounds as f64)?;
                Ok(FundingPlan {
                    bankroll: 0.0,
                    wager,
                    rollover_target: None,
                    round_cap: Some(rounds),
                    bankroll_is_stop: false,
                    clamp_wager_to_bankroll: false,
                    deduct_wager: false,
                    reference: 0.0,
                })
            }
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Cumulative wagered reached the rollover target
    RolloverReached,
    /// The configured round cap (or free-spin batch length) completed
    RoundCapReached,
    /// Bankroll can no longer cover a wager. A valid terminal state, not
    /// an error, even when it makes the rollover target unreachable.
    BankrollExhausted,
}

impl StopReason {
    /// True for every stop except bankruptcy
    pub fn reached_target(self) -> bool {
        self != StopReason::BankrollExhausted
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), SimError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SimError::NonPositiveFunding { name, value })
    }
}

/// Round to the nearest multiple of `increment`
pub(crate) fn round_to_increment(amount: f64, increment: f64) -> f64 {
    (amount / increment).round() * increment
}

/// Largest multiple of `increment` not exceeding `amount`
pub(crate) fn floor_to_increment(amount: f64, increment: f64) -> f64 {
    (amount / increment).floor() * increment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_deposit_bonus_cap_and_basis() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let model = FundingModel::DepositBonus {
            deposit: 200.0,
            multiplier: 2.0,
            bonus_cap: 300.0,
            rollover: 25.0,
            bonus_only_wagering: false,
        };
        let plan = model.resolve(4.0, 0.5, &mut rng).unwrap();
        assert_eq!(plan.bankroll, 400.0);
        assert_eq!(plan.rollover_target, Some(25.0 * 400.0));

        // Cap binds: bonus limited to 300 on a 400 deposit at 2x.
        let model = FundingModel::DepositBonus {
            deposit: 400.0,
            multiplier: 2.0,
            bonus_cap: 300.0,
            rollover: 40.0,
            bonus_only_wagering: true,
        };
        let plan = model.resolve(4.0, 0.5, &mut rng).unwrap();
        assert_eq!(plan.bankroll, 700.0);
        assert_eq!(plan.rollover_target, Some(40.0 * 300.0));
    }

    #[test]
    fn test_cashback_wager_is_increment_fraction_of_credit() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let model = FundingModel::Cashback {
            deposit: 1000.0,
            rate: 0.10,
            cap: 1e9,
            rollover_multiplier: 3.0,
        };
        for _ in 0..100 {
            let plan = model.resolve(4.0, 0.5, &mut rng).unwrap();
            assert_eq!(plan.bankroll, 100.0);
            assert_eq!(plan.rollover_target, Some(300.0));
            assert!(plan.wager >= 0.5);
            // 10-20% of 100, rounded to 0.5 steps.
            assert!((9.5..=20.5).contains(&plan.wager), "wager = {}", plan.wager);
            let steps = plan.wager / 0.5;
            assert!((steps - steps.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_free_spins_plan_ignores_bankroll() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let plan = FundingModel::FreeSpins { rounds: 25 }
            .resolve(0.5, 0.5, &mut rng)
            .unwrap();
        assert_eq!(plan.bankroll, 0.0);
        assert!(!plan.bankroll_is_stop);
        assert!(!plan.deduct_wager);
        assert_eq!(plan.round_cap, Some(25));
    }

    #[test]
    fn test_model_json_uses_kind_tag() {
        let model = FundingModel::Cashback {
            deposit: 1000.0,
            rate: 0.10,
            cap: 500.0,
            rollover_multiplier: 3.0,
        };
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["kind"], "cashback");
        assert_eq!(json["rate"], 0.10);
        let back: FundingModel = serde_json::from_value(json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_rejects_non_positive_wager() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = FundingModel::Cash { deposit: 100.0 }
            .resolve(0.0, 0.5, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::NonPositiveFunding { name: "wager", .. }));
    }
}
