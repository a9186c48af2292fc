//! fortune-lab command line
//!
//! Three entry points into the engine: an interactive round-by-round
//! player, a batch session simulator, and the RTP calibrator.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use fl_engine::{RoundOutcome, SlotMachine, VariantConfig, GRID_COLS, GRID_ROWS};
use fl_sim::{
    run_batch, BatchReport, BatchSpec, CalibrationSpec, Calibrator, FundingModel,
};

#[derive(Parser)]
#[command(name = "fortune-lab", version, about = "Slot variant simulation and calibration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a variant interactively, one round per keypress
    Play(PlayArgs),
    /// Run a batch of wagering sessions and print a report
    Simulate(SimulateArgs),
    /// Search for symbol weights hitting a target RTP
    Calibrate(CalibrateArgs),
}

#[derive(Args)]
struct VariantArgs {
    /// Built-in variant preset (tiger, dragon, mouse)
    #[arg(long, default_value = "tiger", conflicts_with = "config")]
    variant: String,
    /// Load the variant from a JSON file instead of a preset
    #[arg(long)]
    config: Option<PathBuf>,
}

impl VariantArgs {
    fn load(&self) -> Result<VariantConfig> {
        if let Some(ref path) = self.config {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return VariantConfig::from_json(&json)
                .map_err(|e| anyhow::anyhow!("invalid variant config: {e}"));
        }
        VariantConfig::preset(&self.variant)
            .with_context(|| format!("unknown variant preset '{}'", self.variant))
    }
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    variant: VariantArgs,
    /// Starting bankroll
    #[arg(long, default_value_t = 100.0)]
    bankroll: f64,
    /// Wager per round
    #[arg(long, default_value_t = 4.0)]
    wager: f64,
}

#[derive(Args)]
struct SimulateArgs {
    #[command(flatten)]
    variant: VariantArgs,
    /// Funding model (cash, deposit-bonus, cashback, free-spins)
    #[arg(long, default_value = "cash")]
    funding: String,
    /// Deposit amount (cash, deposit-bonus, cashback)
    #[arg(long, default_value_t = 100.0)]
    deposit: f64,
    /// Wager per round
    #[arg(long, default_value_t = 4.0)]
    wager: f64,
    /// Deposit bonus match multiplier
    #[arg(long, default_value_t = 2.0)]
    bonus_multiplier: f64,
    /// Deposit bonus cap
    #[arg(long, default_value_t = 300.0)]
    bonus_cap: f64,
    /// Rollover multiplier (deposit-bonus and cashback)
    #[arg(long, default_value_t = 3.0)]
    rollover: f64,
    /// Count only the bonus amount toward the rollover basis
    #[arg(long)]
    bonus_only_wagering: bool,
    /// Cashback rate
    #[arg(long, default_value_t = 0.10)]
    cashback_rate: f64,
    /// Cashback credit cap
    #[arg(long, default_value_t = 500.0)]
    cashback_cap: f64,
    /// Free spins per session
    #[arg(long, default_value_t = 25)]
    free_spins: u64,
    /// Number of sessions
    #[arg(long, default_value_t = 10_000)]
    sessions: u64,
    /// Optional per-session round cap
    #[arg(long)]
    round_cap: Option<u64>,
    /// Base seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Print the raw report as JSON
    #[arg(long)]
    json: bool,
}

impl SimulateArgs {
    fn funding_model(&self) -> Result<FundingModel> {
        Ok(match self.funding.as_str() {
            "cash" => FundingModel::Cash {
                deposit: self.deposit,
            },
            "deposit-bonus" => FundingModel::DepositBonus {
                deposit: self.deposit,
                multiplier: self.bonus_multiplier,
                bonus_cap: self.bonus_cap,
                rollover: self.rollover,
                bonus_only_wagering: self.bonus_only_wagering,
            },
            "cashback" => FundingModel::Cashback {
                deposit: self.deposit,
                rate: self.cashback_rate,
                cap: self.cashback_cap,
                rollover_multiplier: self.rollover,
            },
            "free-spins" => FundingModel::FreeSpins {
                rounds: self.free_spins,
            },
            other => bail!("unknown funding model '{other}'"),
        })
    }
}

#[derive(Args)]
struct CalibrateArgs {
    #[command(flatten)]
    variant: VariantArgs,
    /// Target return-to-player, e.g. 0.968
    #[arg(long, default_value_t = 0.968)]
    target: f64,
    /// Accepted |measured - target| at verification
    #[arg(long, default_value_t = 0.005)]
    tolerance: f64,
    /// Perturbation trials before giving up
    #[arg(long, default_value_t = 100)]
    trials: u64,
    /// Rounds per trial measurement
    #[arg(long, default_value_t = 100_000)]
    trial_rounds: u64,
    /// Rounds for the final verification
    #[arg(long, default_value_t = 1_000_000)]
    verify_rounds: u64,
    /// Wager per simulated round
    #[arg(long, default_value_t = 4.0)]
    wager: f64,
    /// Base seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Write the calibrated variant config here
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Play(args) => play(args),
        Command::Simulate(args) => simulate(args),
        Command::Calibrate(args) => calibrate(args),
    }
}

fn render_grid(machine: &SlotMachine, outcome: &RoundOutcome) {
    for row in 0..GRID_ROWS as u8 {
        let cells: Vec<&str> = (0..GRID_COLS as u8)
            .map(|col| machine.symbol_name(outcome.grid.at(row, col)).unwrap_or("?"))
            .collect();
        println!("  | {:<10} | {:<10} | {:<10} |", cells[0], cells[1], cells[2]);
    }
}

fn play(args: PlayArgs) -> Result<()> {
    let variant = args.variant.load()?;
    let mut machine = SlotMachine::from_entropy(&variant)?;
    let mut bankroll = args.bankroll;
    let mut wagered = 0.0;
    let mut won = 0.0;

    println!("Playing '{}' at {} per round. Enter to spin, q to quit.", variant.name, args.wager);
    let stdin = io::stdin();
    loop {
        if bankroll < args.wager {
            println!("Bankroll exhausted after {} rounds.", machine.rounds_played());
            break;
        }
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim() == "q" {
            break;
        }

        bankroll -= args.wager;
        wagered += args.wager;
        let outcome = machine.play_round(args.wager)?;
        bankroll += outcome.payout;
        won += outcome.payout;

        render_grid(&machine, &outcome);
        if outcome.jackpot {
            println!("  JACKPOT!");
        }
        if outcome.feature_active {
            println!("  (feature round, multiplier x{})", outcome.multiplier);
        }
        println!(
            "  payout {:.2} | bankroll {:.2} | running RTP {:.4}",
            outcome.payout,
            bankroll,
            won / wagered
        );
    }
    Ok(())
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let spec = BatchSpec {
        variant: args.variant.load()?,
        funding: args.funding_model()?,
        wager: args.wager,
        sessions: args.sessions,
        round_cap: args.round_cap,
        seed: args.seed,
        collect_profits: true,
    };
    let agg = run_batch(&spec)?;
    let report = BatchReport::from_aggregate(&agg);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("sessions            {}", agg.sessions);
    println!("rounds              {}", agg.rounds);
    match report.rtp {
        Some(rtp) => println!("rtp                 {:.4}", rtp),
        None => println!("rtp                 undefined (nothing wagered)"),
    }
    println!("avg rounds          {:.1}", report.avg_rounds);
    println!("avg profit (rel)    {:+.4}", report.avg_relative_profit);
    println!("session volatility  {:.4}", report.session_volatility);
    println!("round volatility    {:.4}", report.round_volatility);
    println!("profitable rate     {:.2}%", report.profitable_rate * 100.0);
    println!("rollover rate       {:.2}%", report.rollover_rate * 100.0);
    println!("bankruptcy rate     {:.2}%", report.bankruptcy_rate * 100.0);
    Ok(())
}

fn calibrate(args: CalibrateArgs) -> Result<()> {
    let variant = args.variant.load()?;
    let spec = CalibrationSpec {
        target_rtp: args.target,
        tolerance: args.tolerance,
        max_trials: args.trials,
        trial_rounds: args.trial_rounds,
        verify_rounds: args.verify_rounds,
        wager: args.wager,
        seed: args.seed,
    };
    let result = Calibrator::new(variant, spec).run()?;

    println!("trials run      {}", result.trials_run);
    println!("trial rtp       {:.4}", result.trial_rtp);
    println!("verified rtp    {:.4}", result.verified_rtp);
    println!("within tolerance: {}", result.met_tolerance);
    if !result.met_tolerance {
        info!("best candidate kept despite missing tolerance; retry with a larger budget");
    }
    let json = result.variant.to_json().context("serializing calibrated config")?;
    if let Some(path) = args.out {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("calibrated config written to {}", path.display());
    } else {
        println!("{json}");
    }
    Ok(())
}
