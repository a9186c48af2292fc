//! Wagering session loop
//!
//! Drives one simulated player round by round: deduct wager, advance the
//! bonus machine, generate and score a grid, credit the payout, then
//! re-check the stopping policy. All mutable state lives in the session;
//! nothing is shared across workers.

use fl_engine::{SlotMachine, VariantConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::funding::{floor_to_increment, FundingModel, FundingPlan, StopReason};

/// Per-session bookkeeping, mutated only by the session loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WagerAccount {
    pub bankroll: f64,
    pub total_wagered: f64,
    pub total_won: f64,
    pub rounds: u64,
}

/// Final report of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub final_bankroll: f64,
    pub rounds: u64,
    pub total_wagered: f64,
    pub total_won: f64,
    /// Per-round payouts in play order
    pub payouts: Vec<f64>,
    pub stop: StopReason,
    /// The wager the session settled on (cashback fixes it per session)
    pub wager: f64,
    /// Funding reference profit is measured against
    pub reference: f64,
}

impl SessionOutcome {
    /// Target stop reached, as opposed to bankruptcy
    pub fn reached_target(&self) -> bool {
        self.stop.reached_target()
    }

    /// Profit relative to the funding reference
    pub fn profit(&self) -> f64 {
        self.final_bankroll - self.reference
    }
}

/// One player's wagering session.
pub struct WagerSession {
    machine: SlotMachine,
    plan: FundingPlan,
    account: WagerAccount,
    payouts: Vec<f64>,
    wager_increment: f64,
    collect_history: bool,
}

impl WagerSession {
    /// Build a session for a variant under a funding model.
    ///
    /// The machine's stream also draws session-level funding parameters,
    /// so a (variant, funding, wager, seed) tuple fully determines the
    /// session.
    pub fn new(
        variant: &VariantConfig,
        funding: &FundingModel,
        wager: f64,
        rng: ChaCha8Rng,
    ) -> Result<Self, SimError> {
        let mut machine = SlotMachine::with_rng(variant, rng)?;
        let plan = funding.resolve(wager, variant.wager_increment, machine.rng_mut())?;
        Ok(Self::from_plan(machine, plan, variant.wager_increment))
    }

    /// Convenience constructor with a plain seed
    pub fn with_seed(
        variant: &VariantConfig,
        funding: &FundingModel,
        wager: f64,
        seed: u64,
    ) -> Result<Self, SimError> {
        Self::new(variant, funding, wager, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build from an already-resolved plan (batch runner, tests).
    pub fn from_plan(machine: SlotMachine, plan: FundingPlan, wager_increment: f64) -> Self {
        let account = WagerAccount {
            bankroll: plan.bankroll,
            ..WagerAccount::default()
        };
        Self {
            machine,
            plan,
            account,
            payouts: Vec::new(),
            wager_increment,
            collect_history: true,
        }
    }

    /// Disable per-round history (large batches)
    pub fn without_history(mut self) -> Self {
        self.collect_history = false;
        self
    }

    /// Further cap the number of rounds (e.g. promotion terms)
    pub fn with_round_cap(mut self, cap: u64) -> Self {
        self.plan.round_cap = Some(self.plan.round_cap.map_or(cap, |c| c.min(cap)));
        self
    }

    /// Current account state
    pub fn account(&self) -> &WagerAccount {
        &self.account
    }

    /// The wager this round would use, or `None` if the session must stop
    /// for lack of bankroll.
    fn next_wager(&self) -> Option<f64> {
        if !self.plan.bankroll_is_stop {
            return Some(self.plan.wager);
        }
        if self.account.bankroll >= self.plan.wager {
            return Some(self.plan.wager);
        }
        if self.plan.clamp_wager_to_bankroll {
            let clamped = floor_to_increment(self.account.bankroll, self.wager_increment);
            if clamped >= self.wager_increment {
                return Some(clamped);
            }
        }
        None
    }

    /// Play one round. Returns `Some(reason)` when the session is over.
    pub fn step(&mut self) -> Result<Option<StopReason>, SimError> {
        let Some(wager) = self.next_wager() else {
            return Ok(Some(StopReason::BankrollExhausted));
        };

        if self.plan.deduct_wager {
            self.account.bankroll -= wager;
        }
        self.account.total_wagered += wager;

        let outcome = self.machine.play_round(wager)?;
        self.account.bankroll += outcome.payout;
        self.account.total_won += outcome.payout;
        self.account.rounds += 1;
        if self.collect_history {
            self.payouts.push(outcome.payout);
        }

        if let Some(target) = self.plan.rollover_target {
            if self.account.total_wagered >= target {
                return Ok(Some(StopReason::RolloverReached));
            }
        }
        if let Some(cap) = self.plan.round_cap {
            if self.account.rounds >= cap {
                return Ok(Some(StopReason::RoundCapReached));
            }
        }
        Ok(None)
    }

    /// Run to completion.
    pub fn run(mut self) -> Result<SessionOutcome, SimError> {
        let stop = loop {
            if let Some(reason) = self.step()? {
                break reason;
            }
        };
        Ok(SessionOutcome {
            final_bankroll: self.account.bankroll,
            rounds: self.account.rounds,
            total_wagered: self.account.total_wagered,
            total_won: self.account.total_won,
            payouts: self.payouts,
            stop,
            wager: self.plan.wager,
            reference: self.plan.reference,
        })
    }
}
