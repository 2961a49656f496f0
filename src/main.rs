use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trade_elasticity::{
    run_all, run_one, AnalysisSpec, Dimension, OutputFormat, OutputOptions, PlannedAnalysis,
    RunConfig, UndefinedPolicy, WrittenReport, DEFAULT_OUTPUT_DIR, DEFAULT_TOP_N,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "trade-elasticity")]
#[command(about = "Trade-volume elasticity to exchange-rate changes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print a JSON summary of the run to stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every analysis listed in a JSON run file
    Run {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Run a single analysis from the command line
    Analyze {
        /// Trade CSV (year, code/country, dollar)
        #[arg(long, value_name = "CSV")]
        trade: PathBuf,

        /// Exchange-rate CSV (year, official, unofficial)
        #[arg(long, value_name = "CSV")]
        exchange: PathBuf,

        /// Label embedded in output file names
        #[arg(short, long)]
        name: String,

        /// Group by country instead of product code
        #[arg(long, conflicts_with = "digit")]
        country: bool,

        /// HS code truncation level (1-6)
        #[arg(short, long, default_value_t = 2)]
        digit: u32,

        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        #[arg(long, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// How undefined category elasticities enter the yearly sum
        #[arg(long, default_value_t = UndefinedPolicy::Skip)]
        policy: UndefinedPolicy,
    },
}

#[derive(Serialize)]
struct AnalysisSummary {
    name: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<DateTime<Utc>>,
    years: usize,
    top_rows: usize,
    years_without_exchange: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<WrittenReport>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    // Keep stdout clean for the JSON summary
    let verbose = !cli.json;

    let summaries = match cli.command {
        Command::Run { config } => run_batch(config, verbose)?,
        Command::Analyze {
            trade,
            exchange,
            name,
            country,
            digit,
            top_n,
            output_dir,
            format,
            policy,
        } => {
            if top_n == 0 {
                bail!("--top-n must be at least 1");
            }
            let dimension = if country {
                Dimension::Country
            } else {
                Dimension::code(digit)?
            };
            let planned = PlannedAnalysis {
                spec: AnalysisSpec::new(&name, dimension)
                    .with_top_n(top_n)
                    .with_policy(policy),
                trade_path: trade,
            };
            let options = OutputOptions { output_dir, format };
            run_single(&planned, &exchange, &options, verbose)?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    let failed = summaries.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        bail!("{} of {} analyses failed", failed, summaries.len());
    }

    Ok(())
}

fn run_batch(config_path: PathBuf, verbose: bool) -> Result<Vec<AnalysisSummary>> {
    let config = RunConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load run file {}", config_path.display()))?;

    if verbose {
        println!("📊 Trade Elasticity - batch run");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("\n📂 {} analyses, output → {}", config.analyses.len(), config.output_dir.display());
    }

    let outcomes = run_all(&config).context("Failed to plan analyses")?;

    let mut summaries = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            Ok((report, written)) => {
                if verbose {
                    println!("✓ {}", report.summary());
                }
                summaries.push(AnalysisSummary {
                    name: outcome.name,
                    ok: true,
                    error: None,
                    generated_at: Some(report.generated_at),
                    years: report.elasticity.len(),
                    top_rows: report.top.len(),
                    years_without_exchange: report.years_without_exchange,
                    files: Some(written),
                });
            }
            // Already reported by the runner's error! log
            Err(e) => summaries.push(failed_summary(outcome.name, e.to_string())),
        }
    }

    if verbose {
        let failed = summaries.iter().filter(|s| !s.ok).count();
        println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("{}", batch_banner(failed, summaries.len(), &config.output_dir));
    }

    Ok(summaries)
}

fn batch_banner(failed: usize, total: usize, output_dir: &Path) -> String {
    if failed == 0 {
        format!("✅ Elasticity results saved in {}/", output_dir.display())
    } else {
        format!("⚠️  {} of {} analyses failed, see log above", failed, total)
    }
}

fn run_single(
    planned: &PlannedAnalysis,
    exchange: &Path,
    options: &OutputOptions,
    verbose: bool,
) -> Result<Vec<AnalysisSummary>> {
    let (report, written) = run_one(planned, exchange, options)
        .with_context(|| format!("Analysis '{}' failed", planned.spec.name))?;

    if verbose {
        println!("✓ {}", report.summary());
        println!("✅ Elasticity results saved in {}/", options.output_dir.display());
    }

    Ok(vec![AnalysisSummary {
        name: report.name.clone(),
        ok: true,
        error: None,
        generated_at: Some(report.generated_at),
        years: report.elasticity.len(),
        top_rows: report.top.len(),
        years_without_exchange: report.years_without_exchange,
        files: Some(written),
    }])
}

fn failed_summary(name: String, error: String) -> AnalysisSummary {
    AnalysisSummary {
        name,
        ok: false,
        error: Some(error),
        generated_at: None,
        years: 0,
        top_rows: 0,
        years_without_exchange: Vec::new(),
        files: None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_claims_success_only_without_failures() {
        let dir = Path::new("results");

        assert!(batch_banner(0, 4, dir).starts_with("✅"));

        let partial = batch_banner(1, 4, dir);
        assert!(!partial.contains("saved"));
        assert!(partial.contains("1 of 4 analyses failed"));
    }
}
