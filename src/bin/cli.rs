//! Edgerank CLI - Evaluate subjects and run backtests from the command line

use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use edgerank::backtesting::{
    BacktestConfig, BacktestRunner, HistoricalSample, SyntheticSampleGenerator,
};
use edgerank::config::Config;
use edgerank::core::kelly::KellySizer;
use edgerank::ledger::BankrollLedger;
use edgerank::models::{
    Context, CorrelationTable, ExternalSignals, FeatureVector, Odds, Recommendation, Tier,
};
use edgerank::pipeline::Composer;

#[derive(Parser)]
#[command(name = "edgerank")]
#[command(author, version, about = "Betting decision pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single subject through the scoring pipeline
    Evaluate {
        /// Path to a JSON evaluation request (features, context, correlations)
        #[arg(short, long)]
        input: PathBuf,

        /// Market odds to size against (American like -110, or decimal like 1.91)
        #[arg(long, allow_hyphen_values = true)]
        odds: Option<String>,

        /// Bankroll for stake suggestions
        #[arg(long, default_value = "10000")]
        bankroll: f64,

        /// Kelly multiplier (0.25 = quarter Kelly)
        #[arg(long, default_value = "0.25")]
        kelly: f64,

        /// Emit the recommendation as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a backtest over historical or synthetic samples
    Backtest {
        /// Path to a JSON array of historical samples
        #[arg(long)]
        samples: Option<PathBuf>,

        /// Path to a JSON correlation table (required with --samples)
        #[arg(long)]
        correlations: Option<PathBuf>,

        /// Generate this many synthetic samples instead of loading a file
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic generation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Starting bankroll
        #[arg(long, default_value = "10000")]
        bankroll: f64,

        /// Kelly multiplier (0.25 = quarter Kelly)
        #[arg(long, default_value = "0.25")]
        kelly: f64,

        /// Minimum tier worth staking: pass, lean, bet, confident_bet, strong_bet
        #[arg(long, default_value = "lean")]
        min_tier: String,
    },
}

/// One evaluation request as read from --input.
#[derive(Deserialize)]
struct EvaluationRequest {
    features: FeatureVector,
    #[serde(default)]
    opponent: Option<FeatureVector>,
    context: Context,
    #[serde(default)]
    signals: Option<ExternalSignals>,
    correlations: CorrelationTable,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    println!("{}", "Edgerank CLI v0.2.0".cyan().bold());
    println!();

    let config = match &cli.config {
        Some(path) => Config::from_file(path).map_err(|e| anyhow::anyhow!(e))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Evaluate {
            input,
            odds,
            bankroll,
            kelly,
            json,
        } => run_evaluate(&config, &input, odds.as_deref(), bankroll, kelly, json),
        Commands::Backtest {
            samples,
            correlations,
            synthetic,
            seed,
            bankroll,
            kelly,
            min_tier,
        } => run_backtest(
            &config,
            samples.as_deref(),
            correlations.as_deref(),
            synthetic,
            seed,
            bankroll,
            kelly,
            &min_tier,
        ),
    }
}

fn run_evaluate(
    config: &Config,
    input: &Path,
    odds: Option<&str>,
    bankroll: f64,
    kelly: f64,
    json: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read request from {:?}", input))?;
    let request: EvaluationRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse request from {:?}", input))?;

    let composer = Composer::new(request.correlations, config.pipeline.clone());
    let rec = composer.evaluate(
        &request.features,
        request.opponent.as_ref(),
        &request.context,
        request.signals.as_ref(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
        return Ok(());
    }

    print_recommendation(&rec);

    if let Some(odds_str) = odds {
        let odds = parse_odds(odds_str)?;
        let decimal = odds
            .decimal()
            .with_context(|| format!("Invalid odds: {}", odds_str))?;
        let implied = (1.0 / decimal) * (1.0 - config.pipeline.vig_percentage);
        let edge = rec.score / 100.0 - implied;

        let sizer = KellySizer::new(kelly);
        let detail = sizer.size_detailed(edge, &odds, rec.confidence)?;
        let ledger = BankrollLedger::new(bankroll, config.ledger.clone());
        let quote = ledger.quote(detail.fraction);

        println!("{}", "Sizing:".yellow().bold());
        println!("  Decimal odds: {:.3}", decimal);
        println!("  Implied probability (de-vig): {:.1}%", implied * 100.0);
        println!("  Edge: {:+.3}", edge);
        println!("  Kelly fraction (scaled): {:.4}", detail.fraction);
        match quote.reason {
            None => println!("  Suggested stake: {}", format!("{:.2}", quote.stake).green()),
            Some(reason) => println!(
                "  Suggested stake: {:.2} ({})",
                quote.stake,
                reason.to_string().yellow()
            ),
        }
    }

    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    println!("{}", "Stage trace:".yellow().bold());
    println!(
        "{:>20} {:>8} {:>8} {:>8}  {}",
        "Stage", "Mult", "Score", "Conf", "Rationale"
    );
    println!("{}", "-".repeat(78));
    for stage in &rec.trace {
        println!(
            "{:>20} {:>8.3} {:>8.1} {:>8.1}  {}",
            stage.stage,
            stage.multiplier,
            stage.score_after,
            stage.confidence_after,
            stage.rationale
        );
    }
    println!();

    let label = rec.tier_label();
    let label = match rec.tier {
        Tier::StrongBet | Tier::ConfidentBet => label.green().bold(),
        Tier::Bet | Tier::Lean => label.yellow(),
        Tier::Pass => label.dimmed(),
    };
    println!(
        "{} {} (score {:.1}, confidence {:.1}, cumulative x{:.2})",
        "Recommendation:".green(),
        label,
        rec.score,
        rec.confidence,
        rec.cumulative_multiplier
    );
    println!();
}

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    config: &Config,
    samples_path: Option<&Path>,
    correlations_path: Option<&Path>,
    synthetic: Option<usize>,
    seed: u64,
    bankroll: f64,
    kelly: f64,
    min_tier: &str,
) -> Result<()> {
    println!("{}", "Running backtest...".green());

    let (samples, correlations) = match (samples_path, synthetic) {
        (Some(path), None) => {
            let corr_path = correlations_path
                .context("--correlations is required when loading samples from a file")?;
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read samples from {:?}", path))?;
            let samples: Vec<HistoricalSample> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse samples from {:?}", path))?;

            let raw = std::fs::read_to_string(corr_path)
                .with_context(|| format!("Failed to read correlations from {:?}", corr_path))?;
            let correlations: CorrelationTable = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse correlations from {:?}", corr_path))?;

            (samples, correlations)
        }
        (None, Some(count)) => {
            println!("Generating {} synthetic samples (seed {})", count, seed);
            let samples = SyntheticSampleGenerator::with_seed(seed).generate(count);
            (samples, SyntheticSampleGenerator::correlations())
        }
        (Some(_), Some(_)) => bail!("--samples and --synthetic are mutually exclusive"),
        (None, None) => bail!("Provide either --samples or --synthetic"),
    };

    if samples.is_empty() {
        bail!("No samples to backtest");
    }
    println!("Loaded {} samples", samples.len());

    let backtest_config = BacktestConfig {
        initial_bankroll: bankroll,
        fractional_kelly: kelly,
        min_tier: parse_tier(min_tier)?,
        ledger: config.ledger.clone(),
    };

    let composer = Composer::new(correlations, config.pipeline.clone());
    let runner = BacktestRunner::new(composer, backtest_config);
    let result = runner.run(&samples);

    runner.print_summary(&result);

    if !result.bets.is_empty() {
        println!("\n{}", "Analysis by Tier:".yellow().bold());
        let tier_analysis = edgerank::backtesting::metrics::analyze_by_tier(&result.bets);
        println!(
            "{:>15} {:>8} {:>8} {:>10} {:>12} {:>10}",
            "Tier", "Bets", "Wins", "Hit Rate", "Profit", "ROI"
        );
        println!("{}", "-".repeat(68));
        for a in &tier_analysis {
            println!(
                "{:>15} {:>8} {:>8} {:>9.1}% {:>12.2} {:>9.1}%",
                a.key,
                a.bets,
                a.wins,
                a.hit_rate * 100.0,
                a.profit,
                a.roi * 100.0
            );
        }

        println!("\n{}", "Analysis by Odds Range:".yellow().bold());
        let odds_analysis = edgerank::backtesting::metrics::analyze_by_odds_range(&result.bets);
        println!(
            "{:>15} {:>8} {:>8} {:>10} {:>12} {:>10}",
            "Range", "Bets", "Wins", "Hit Rate", "Profit", "ROI"
        );
        println!("{}", "-".repeat(68));
        for a in &odds_analysis {
            println!(
                "{:>15} {:>8} {:>8} {:>9.1}% {:>12.2} {:>9.1}%",
                a.key,
                a.bets,
                a.wins,
                a.hit_rate * 100.0,
                a.profit,
                a.roi * 100.0
            );
        }

        let sharpe = edgerank::backtesting::calculate_sharpe_ratio(&result.bets, 0.0);
        println!("\nSharpe ratio: {:.2}", sharpe);
    }

    Ok(())
}

/// Parse "-110" / "+150" as American odds, "1.91" as decimal.
fn parse_odds(s: &str) -> Result<Odds> {
    let trimmed = s.trim();
    if trimmed.contains('.') {
        let decimal: f64 = trimmed
            .parse()
            .with_context(|| format!("Invalid decimal odds: {}", s))?;
        Ok(Odds::Decimal(decimal))
    } else {
        let american: i32 = trimmed
            .parse()
            .with_context(|| format!("Invalid American odds: {}", s))?;
        Ok(Odds::American(american))
    }
}

fn parse_tier(s: &str) -> Result<Tier> {
    match s.to_lowercase().as_str() {
        "pass" => Ok(Tier::Pass),
        "lean" => Ok(Tier::Lean),
        "bet" => Ok(Tier::Bet),
        "confident_bet" | "confident-bet" => Ok(Tier::ConfidentBet),
        "strong_bet" | "strong-bet" => Ok(Tier::StrongBet),
        other => bail!(
            "Unknown tier '{}'. Use pass, lean, bet, confident_bet, or strong_bet",
            other
        ),
    }
}
