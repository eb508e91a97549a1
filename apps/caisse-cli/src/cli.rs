//! Command-line surface of the `caisse` binary.

use std::path::PathBuf;

use caisse_core::loyalty::{earn_points, spend_to_next_tier, tier_benefits, tier_for, tier_progress};
use caisse_core::{InMemoryUsageCounter, LoyaltyProgram, LoyaltyTier, Money};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::checkout::{run_checkout, CheckoutScenario};
use crate::config::CaisseConfig;
use crate::error::{CliError, CliResult};

#[derive(Debug, Parser)]
#[command(name = "caisse", about = "Promotion and loyalty rules for the Caisse POS", long_about = None)]
pub(crate) struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a sale scenario through the engine
    Checkout(CheckoutArgs),
    /// Show the tier for a lifetime spend
    Tier(TierArgs),
    /// Show the points earned on an amount
    Points(PointsArgs),
    /// Inspect or create the config file
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Scenario JSON file
    scenario: PathBuf,
    /// Evaluation instant (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
struct TierArgs {
    /// Lifetime spend in FCFA
    total_spent: i64,
}

#[derive(Debug, Args)]
struct PointsArgs {
    /// Amount in FCFA
    amount: i64,
    /// Evaluation instant (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// False for commands that must work without a readable config file.
    pub(crate) fn needs_config(&self) -> bool {
        !matches!(
            self.command,
            Commands::Config(ConfigCommand {
                command: ConfigSubcommand::Init { .. }
            })
        )
    }

    pub(crate) fn run(self, config: &CaisseConfig) -> CliResult<()> {
        match self.command {
            Commands::Checkout(args) => {
                let scenario = CheckoutScenario::from_file(&args.scenario)?;
                let counter = InMemoryUsageCounter::new();
                if let Some(promo) = &scenario.promo {
                    counter.seed(
                        &promo.code,
                        promo.usage_count,
                        [(scenario.customer_id.clone(), scenario.customer_usage_count)],
                    )?;
                }
                let now = args.now.unwrap_or_else(Utc::now);
                let report = run_checkout(&scenario, &config.loyalty, &counter, now)?;
                print_json(&report)
            }
            Commands::Tier(args) => print_json(&tier_report(Money::from_units(args.total_spent))),
            Commands::Points(args) => {
                let now = args.now.unwrap_or_else(Utc::now);
                print_json(&points_report(Money::from_units(args.amount), &config.loyalty, now))
            }
            Commands::Config(ConfigCommand { command }) => match command {
                ConfigSubcommand::Show => {
                    print!("{}", config.to_toml()?);
                    Ok(())
                }
                ConfigSubcommand::Init { force } => {
                    let path = self
                        .config
                        .or_else(CaisseConfig::default_config_path)
                        .ok_or_else(|| CliError::ConfigSaveFailed("No config path available".into()))?;
                    if path.exists() && !force {
                        return Err(CliError::ConfigExists(path));
                    }
                    let written = config.save(Some(path))?;
                    println!("{}", written.display());
                    Ok(())
                }
            },
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TierReport {
    total_spent: Money,
    tier: LoyaltyTier,
    progress: f64,
    /// Absent at the top tier.
    spend_to_next_tier: Option<Money>,
    benefits: &'static [&'static str],
}

pub(crate) fn tier_report(total_spent: Money) -> TierReport {
    let tier = tier_for(total_spent);
    debug!(%total_spent, %tier, "Tier lookup");
    TierReport {
        total_spent,
        tier,
        progress: tier_progress(total_spent),
        spend_to_next_tier: spend_to_next_tier(total_spent),
        benefits: tier_benefits(tier),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PointsReport {
    amount: Money,
    points: u64,
    program_active: bool,
    /// Multiplier applied, when a bonus window is open.
    bonus_multiplier: Option<f64>,
}

pub(crate) fn points_report(
    amount: Money,
    program: &LoyaltyProgram,
    now: DateTime<Utc>,
) -> PointsReport {
    PointsReport {
        amount,
        points: earn_points(amount, program, now),
        program_active: program.is_active,
        bonus_multiplier: program
            .is_active
            .then(|| program.active_bonus(now))
            .flatten()
            .map(|m| m.factor()),
    }
}
