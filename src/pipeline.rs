// ⚙️ Elasticity Pipeline - one generic analysis for any grouping dimension
//
// densify → trade deltas ─┐
//                         ├→ join → aggregate  (elasticity summary)
// exchange deltas ────────┘      └→ top-N      (weighted subset)
//
// Every call is a pure function of its inputs; nothing is shared between runs.

use crate::delta::{exchange_deltas, trade_deltas};
use crate::elasticity::{aggregate, join, ElasticityRow, UndefinedPolicy};
use crate::error::Result;
use crate::panel::densify;
use crate::records::{Dimension, ExchangeRecord, TradeRecord};
use crate::top_n::{select_top_n, WeightedRow, DEFAULT_TOP_N};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// ANALYSIS SPEC
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSpec {
    /// Label embedded in output names (e.g. "Export_HS2")
    pub name: String,
    pub dimension: Dimension,
    pub top_n: usize,
    pub policy: UndefinedPolicy,
}

impl AnalysisSpec {
    pub fn new(name: &str, dimension: Dimension) -> Self {
        AnalysisSpec {
            name: name.to_string(),
            dimension,
            top_n: DEFAULT_TOP_N,
            policy: UndefinedPolicy::default(),
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_policy(mut self, policy: UndefinedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `Elasticity_Analysis_<name>`, with `Country_` for the country dimension
    pub fn elasticity_stem(&self) -> String {
        format!("Elasticity_Analysis_{}{}", self.dimension_infix(), self.name)
    }

    /// `Top_<N>_Elasticity_<name>`, with `Country_` for the country dimension
    pub fn top_stem(&self) -> String {
        format!(
            "Top_{}_Elasticity_{}{}",
            self.top_n,
            self.dimension_infix(),
            self.name
        )
    }

    fn dimension_infix(&self) -> &'static str {
        if self.dimension.is_country() {
            "Country_"
        } else {
            ""
        }
    }
}

// ============================================================================
// ANALYSIS REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub name: String,

    /// One row per year present on both sides, ascending
    pub elasticity: Vec<ElasticityRow>,

    /// At most `top_n` rows per year
    pub top: Vec<WeightedRow>,

    /// Trade years dropped by the join for lack of an exchange quotation
    pub years_without_exchange: Vec<i32>,

    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn is_empty(&self) -> bool {
        self.elasticity.is_empty()
    }

    pub fn summary(&self) -> String {
        let defined = self
            .elasticity
            .iter()
            .filter(|row| row.elasticity.is_some())
            .count();
        format!(
            "{}: {} years ({} defined), {} top rows, {} trade years without exchange data",
            self.name,
            self.elasticity.len(),
            defined,
            self.top.len(),
            self.years_without_exchange.len()
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Run the full pipeline for one grouping dimension
pub fn analyze(
    trade: &[TradeRecord],
    exchange: &[ExchangeRecord],
    spec: &AnalysisSpec,
) -> Result<AnalysisReport> {
    info!(
        name = %spec.name,
        dimension = spec.dimension.column(),
        trade_rows = trade.len(),
        exchange_rows = exchange.len(),
        "starting elasticity analysis"
    );

    let panel = densify(trade, &spec.dimension)?;
    let trade_side = trade_deltas(&panel);
    let rate_side = exchange_deltas(exchange);

    let years_without_exchange: Vec<i32> = panel
        .years
        .iter()
        .copied()
        .filter(|year| rate_side.binary_search_by_key(year, |r| r.year).is_err())
        .collect();

    let joined = join(&trade_side, &rate_side);
    let elasticity = aggregate(&joined, spec.policy);
    let top = select_top_n(&joined, spec.top_n);

    if elasticity.is_empty() {
        warn!(name = %spec.name, "no overlapping years; report is empty");
    }

    let report = AnalysisReport {
        name: spec.name.clone(),
        elasticity,
        top,
        years_without_exchange,
        generated_at: Utc::now(),
    };

    info!(name = %spec.name, "{}", report.summary());

    Ok(report)
}

/// Code-level analysis, truncating HS-6 codes to `digit` digits
pub fn elasticity_analysis(
    trade: &[TradeRecord],
    exchange: &[ExchangeRecord],
    digit: u32,
    name: &str,
) -> Result<AnalysisReport> {
    let spec = AnalysisSpec::new(name, Dimension::code(digit)?);
    analyze(trade, exchange, &spec)
}

/// Country-level analysis
pub fn elasticity_analysis_country(
    trade: &[TradeRecord],
    exchange: &[ExchangeRecord],
    name: &str,
) -> Result<AnalysisReport> {
    let spec = AnalysisSpec::new(name, Dimension::Country);
    analyze(trade, exchange, &spec)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trade() -> Vec<TradeRecord> {
        vec![
            TradeRecord::by_country(2020, "A", 100.0),
            TradeRecord::by_country(2020, "B", 50.0),
            TradeRecord::by_country(2021, "A", 120.0),
            TradeRecord::by_country(2021, "B", 40.0),
        ]
    }

    fn exchange() -> Vec<ExchangeRecord> {
        vec![
            ExchangeRecord::new(2020, 10.0, 12.0),
            ExchangeRecord::new(2021, 10.0, 15.0),
        ]
    }

    #[test]
    fn test_country_analysis_end_to_end() {
        let report = elasticity_analysis_country(&trade(), &exchange(), "Export_Country").unwrap();

        assert_eq!(report.elasticity.len(), 2);
        assert_eq!(report.elasticity[0].elasticity, None);

        // A: 0.125 / 0.2 = 0.625, B: -0.0625 / 0.2 = -0.3125
        assert_relative_eq!(report.elasticity[1].elasticity.unwrap(), 0.3125);
        assert_eq!(report.elasticity[1].contributors, 2);

        assert_eq!(report.top.len(), 4);
        assert!(report.years_without_exchange.is_empty());
    }

    #[test]
    fn test_code_analysis_truncates() {
        let trade = vec![
            TradeRecord::by_code(2020, 123456, 10.0),
            TradeRecord::by_code(2020, 129999, 10.0),
            TradeRecord::by_code(2021, 120000, 30.0),
        ];
        let report = elasticity_analysis(&trade, &exchange(), 2, "Export_HS2").unwrap();

        assert_eq!(report.top.len(), 2);
        assert_eq!(report.top[0].dollar, 20.0);
        assert_eq!(report.top[0].weight, 1.0);
    }

    #[test]
    fn test_code_analysis_rejects_bad_digit() {
        assert!(elasticity_analysis(&trade(), &exchange(), 9, "x").is_err());
    }

    #[test]
    fn test_disjoint_years_give_empty_report() {
        let rates = vec![ExchangeRecord::new(1990, 1.0, 1.0)];
        let report = elasticity_analysis_country(&trade(), &rates, "Disjoint").unwrap();

        assert!(report.is_empty());
        assert!(report.top.is_empty());
        assert_eq!(report.years_without_exchange, vec![2020, 2021]);
    }

    #[test]
    fn test_output_stems() {
        let code = AnalysisSpec::new("Export_HS2", Dimension::code(2).unwrap());
        assert_eq!(code.elasticity_stem(), "Elasticity_Analysis_Export_HS2");
        assert_eq!(code.top_stem(), "Top_10_Elasticity_Export_HS2");

        let country = AnalysisSpec::new("Import", Dimension::Country).with_top_n(5);
        assert_eq!(country.elasticity_stem(), "Elasticity_Analysis_Country_Import");
        assert_eq!(country.top_stem(), "Top_5_Elasticity_Country_Import");
    }
}
