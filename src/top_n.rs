// 🏆 Top-N Selector - largest trade-weight categories per year
// weight = dollar / total_trade (ranking only, never fed back into elasticity)

use crate::elasticity::JoinedRow;
use crate::records::{ratio, CategoryKey};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Default number of categories kept per year
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedRow {
    pub year: i32,
    pub category: CategoryKey,
    pub dollar: f64,
    pub total_trade: f64,
    pub delta_export_share: Option<f64>,
    pub official_avg: f64,
    pub unofficial_avg: f64,
    pub delta_unofficial: Option<f64>,
    pub elasticity: Option<f64>,
    pub weight: f64,
}

impl WeightedRow {
    fn from_joined(row: &JoinedRow, weight: f64) -> Self {
        WeightedRow {
            year: row.year,
            category: row.category.clone(),
            dollar: row.dollar,
            total_trade: row.total_trade,
            delta_export_share: row.delta_export_share,
            official_avg: row.official_avg,
            unofficial_avg: row.unofficial_avg,
            delta_unofficial: row.delta_unofficial,
            elasticity: row.elasticity,
            weight,
        }
    }
}

/// Keep the `n` heaviest rows of each year.
///
/// Rows with an undefined weight (zero total trade) are never ranked.
/// Ties keep input order: the sort is stable and descending.
pub fn select_top_n(joined: &[JoinedRow], n: usize) -> Vec<WeightedRow> {
    let mut by_year: BTreeMap<i32, Vec<WeightedRow>> = BTreeMap::new();

    for row in joined {
        if let Some(weight) = ratio(Some(row.dollar), Some(row.total_trade)) {
            by_year
                .entry(row.year)
                .or_default()
                .push(WeightedRow::from_joined(row, weight));
        }
    }

    let mut selected = Vec::new();
    for (_, mut rows) in by_year {
        rows.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        rows.truncate(n);
        selected.extend(rows);
    }

    debug!(n, rows = selected.len(), "selected top-weighted categories");

    selected
}

// ============================================================================
// TESTS
// ============================================================================
