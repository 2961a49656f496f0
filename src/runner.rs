// 🚀 Batch Runner - every configured analysis, each in isolation
//
// Analyses run on the rayon pool. Each one loads its own copy of the inputs,
// so a failure in one (bad file, missing column, unwritable output) never
// touches the others.

use crate::config::{PlannedAnalysis, RunConfig};
use crate::error::Result;
use crate::loader::{load_exchange_csv, load_trade_csv};
use crate::pipeline::{analyze, AnalysisReport};
use crate::report::{write_report, OutputOptions, WrittenReport};
use rayon::prelude::*;
use std::path::Path;
use tracing::{error, info};

/// Result of one analysis in a batch
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub name: String,
    pub result: Result<(AnalysisReport, WrittenReport)>,
}

impl AnalysisOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Load, analyze and write one analysis end to end
pub fn run_one(
    planned: &PlannedAnalysis,
    exchange_path: &Path,
    options: &OutputOptions,
) -> Result<(AnalysisReport, WrittenReport)> {
    let trade = load_trade_csv(&planned.trade_path, &planned.spec.dimension)?;
    let exchange = load_exchange_csv(exchange_path)?;

    let report = analyze(&trade, &exchange, &planned.spec)?;
    let written = write_report(&report, &planned.spec, options)?;

    Ok((report, written))
}

/// Run the whole batch. Outcomes come back in configuration order.
pub fn run_all(config: &RunConfig) -> Result<Vec<AnalysisOutcome>> {
    let plan = config.plan()?;
    let options = config.output_options();

    info!(analyses = plan.len(), "running elasticity batch");

    let outcomes: Vec<AnalysisOutcome> = plan
        .par_iter()
        .map(|planned| {
            let result = run_one(planned, &config.exchange, &options);
            if let Err(e) = &result {
                error!(name = %planned.spec.name, error = %e, "analysis failed");
            }
            AnalysisOutcome {
                name: planned.spec.name.clone(),
                result,
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        succeeded = outcomes.len() - failed,
        failed,
        "elasticity batch finished"
    );

    Ok(outcomes)
}
