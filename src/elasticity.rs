// 🔗 Elasticity Joiner - trade deltas ⋈ exchange deltas on year
//
// elasticity = deltaExportShare / deltaUnofficial, per (year, category),
// then summed into one value per year.

use crate::delta::{DeltaRow, ExchangeDelta};
use crate::records::{ratio, CategoryKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

// ============================================================================
// JOINED ROW
// ============================================================================

/// One (year, category) cell after the inner join, before aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub year: i32,
    pub category: CategoryKey,
    pub dollar: f64,
    pub total_trade: f64,
    pub delta_export_share: Option<f64>,
    pub official_avg: f64,
    pub unofficial_avg: f64,
    pub delta_unofficial: Option<f64>,
    pub elasticity: Option<f64>,
}

/// Inner join on year. Trade rows whose year has no exchange quotation are
/// dropped; row order of the trade side is preserved.
pub fn join(trade: &[DeltaRow], exchange: &[ExchangeDelta]) -> Vec<JoinedRow> {
    let rates: HashMap<i32, &ExchangeDelta> = exchange.iter().map(|e| (e.year, e)).collect();

    let joined: Vec<JoinedRow> = trade
        .iter()
        .filter_map(|row| {
            let rate = rates.get(&row.year)?;
            Some(JoinedRow {
                year: row.year,
                category: row.category.clone(),
                dollar: row.dollar,
                total_trade: row.total_trade,
                delta_export_share: row.delta_export_share,
                official_avg: rate.official_avg,
                unofficial_avg: rate.unofficial_avg,
                delta_unofficial: rate.delta_unofficial,
                elasticity: ratio(row.delta_export_share, rate.delta_unofficial),
            })
        })
        .collect();

    if joined.is_empty() && !trade.is_empty() {
        warn!("trade and exchange-rate years do not overlap; join is empty");
    } else {
        debug!(
            trade_rows = trade.len(),
            joined_rows = joined.len(),
            "joined trade and exchange deltas"
        );
    }

    joined
}

// ============================================================================
// UNDEFINED POLICY
// ============================================================================

/// How undefined per-category elasticities enter the yearly sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Skip undefined values. A year with no defined value at all is undefined.
    #[default]
    Skip,

    /// Any undefined value makes the whole year undefined
    Propagate,
}

impl fmt::Display for UndefinedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedPolicy::Skip => write!(f, "skip"),
            UndefinedPolicy::Propagate => write!(f, "propagate"),
        }
    }
}

impl FromStr for UndefinedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(UndefinedPolicy::Skip),
            "propagate" => Ok(UndefinedPolicy::Propagate),
            other => Err(format!(
                "unknown undefined policy '{}' (expected skip or propagate)",
                other
            )),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElasticityRow {
    pub year: i32,
    pub elasticity: Option<f64>,

    /// Categories with a defined elasticity this year
    pub contributors: usize,
}

#[derive(Default)]
struct YearSum {
    sum: f64,
    defined: usize,
    undefined: usize,
}

/// Sum elasticities per year. Exactly one row per joined year, ascending.
pub fn aggregate(joined: &[JoinedRow], policy: UndefinedPolicy) -> Vec<ElasticityRow> {
    let mut by_year: BTreeMap<i32, YearSum> = BTreeMap::new();

    for row in joined {
        let acc = by_year.entry(row.year).or_default();
        match row.elasticity {
            Some(value) => {
                acc.sum += value;
                acc.defined += 1;
            }
            None => acc.undefined += 1,
        }
    }

    by_year
        .into_iter()
        .map(|(year, acc)| {
            let elasticity = match policy {
                UndefinedPolicy::Skip if acc.defined > 0 => Some(acc.sum),
                UndefinedPolicy::Propagate if acc.undefined == 0 && acc.defined > 0 => {
                    Some(acc.sum)
                }
                _ => None,
            };

            ElasticityRow {
                year,
                elasticity,
                contributors: acc.defined,
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn delta(year: i32, category: &str, dollar: f64, total: f64, share: Option<f64>) -> DeltaRow {
        DeltaRow {
            year,
            category: CategoryKey::Country(category.to_string()),
            dollar,
            total_trade: total,
            delta_export_share: share,
        }
    }

    fn rate(year: i32, unofficial: f64, delta: Option<f64>) -> ExchangeDelta {
        ExchangeDelta {
            year,
            official_avg: 10.0,
            unofficial_avg: unofficial,
            delta_unofficial: delta,
        }
    }

    #[test]
    fn test_join_drops_years_without_rates() {
        let trade = vec![
            delta(2019, "A", 1.0, 1.0, None),
            delta(2020, "A", 2.0, 2.0, Some(0.5)),
        ];
        let exchange = vec![rate(2020, 12.0, Some(0.25))];

        let joined = join(&trade, &exchange);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].year, 2020);
        assert_relative_eq!(joined[0].elasticity.unwrap(), 2.0);
    }

    #[test]
    fn test_join_disjoint_years_is_empty_not_error() {
        let trade = vec![delta(2019, "A", 1.0, 1.0, None)];
        let exchange = vec![rate(2030, 12.0, None)];
        assert!(join(&trade, &exchange).is_empty());
    }

    #[test]
    fn test_zero_rate_delta_gives_undefined_elasticity() {
        let trade = vec![delta(2021, "A", 2.0, 2.0, Some(0.5))];
        let exchange = vec![rate(2021, 12.0, Some(0.0))];
        assert_eq!(join(&trade, &exchange)[0].elasticity, None);
    }

    #[test]
    fn test_aggregate_skip_policy() {
        let trade = vec![
            delta(2020, "A", 1.0, 2.0, None),
            delta(2020, "B", 1.0, 2.0, None),
            delta(2021, "A", 1.0, 2.0, Some(0.1)),
            delta(2021, "B", 1.0, 2.0, Some(0.3)),
            delta(2021, "C", 0.0, 2.0, None),
        ];
        let exchange = vec![rate(2020, 10.0, None), rate(2021, 12.0, Some(0.2))];

        let rows = aggregate(&join(&trade, &exchange), UndefinedPolicy::Skip);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 2020);
        assert_eq!(rows[0].elasticity, None);
        assert_eq!(rows[0].contributors, 0);
        assert_relative_eq!(rows[1].elasticity.unwrap(), 2.0);
        assert_eq!(rows[1].contributors, 2);
    }

    #[test]
    fn test_aggregate_propagate_policy() {
        let trade = vec![
            delta(2021, "A", 1.0, 2.0, Some(0.1)),
            delta(2021, "B", 1.0, 2.0, None),
            delta(2022, "A", 1.0, 2.0, Some(0.1)),
        ];
        let exchange = vec![rate(2021, 12.0, Some(0.2)), rate(2022, 12.0, Some(0.5))];

        let rows = aggregate(&join(&trade, &exchange), UndefinedPolicy::Propagate);

        assert_eq!(rows[0].elasticity, None);
        assert_eq!(rows[0].contributors, 1);
        assert_relative_eq!(rows[1].elasticity.unwrap(), 0.2);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("skip".parse::<UndefinedPolicy>().unwrap(), UndefinedPolicy::Skip);
        assert_eq!(
            "Propagate".parse::<UndefinedPolicy>().unwrap(),
            UndefinedPolicy::Propagate
        );
        assert!("zero".parse::<UndefinedPolicy>().is_err());
        assert_eq!(UndefinedPolicy::default(), UndefinedPolicy::Skip);
    }
}
