// 📈 Delta Calculator - year-over-year changes on both sides of the join
//
// Trade side:    deltaExportShare = (dollar_t - dollar_{t-1}) / total_trade_t
// Exchange side: deltaUnofficial  = (rate_t - rate_{t-1}) / rate_t
//
// "t-1" is the preceding OBSERVED year, not the calendar year before.
// The first observed year has no prior value, so its delta is undefined.

use crate::panel::DensePanel;
use crate::records::{ratio, CategoryKey, ExchangeRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// TRADE SIDE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRow {
    pub year: i32,
    pub category: CategoryKey,
    pub dollar: f64,
    pub total_trade: f64,

    /// Change in this category's trade relative to the year's total.
    /// `None` for the first year or when total trade is zero.
    pub delta_export_share: Option<f64>,
}

/// Attach `delta_export_share` to every cell of the panel.
///
/// The panel is dense, so the prior cell for the same category always exists
/// one year-block earlier.
pub fn trade_deltas(panel: &DensePanel) -> Vec<DeltaRow> {
    let width = panel.categories.len();

    let deltas: Vec<DeltaRow> = panel
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let prior = idx.checked_sub(width).map(|p| panel.rows[p].dollar);
            let change = prior.map(|prev| row.dollar - prev);

            DeltaRow {
                year: row.year,
                category: row.category.clone(),
                dollar: row.dollar,
                total_trade: row.total_trade,
                delta_export_share: ratio(change, Some(row.total_trade)),
            }
        })
        .collect();

    debug!(
        rows = deltas.len(),
        undefined = deltas.iter().filter(|d| d.delta_export_share.is_none()).count(),
        "computed trade share deltas"
    );

    deltas
}

// ============================================================================
// EXCHANGE SIDE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeDelta {
    pub year: i32,
    pub official_avg: f64,
    pub unofficial_avg: f64,

    /// Relative change of the averaged unofficial rate; `None` for the first
    /// year or when the current rate is zero
    pub delta_unofficial: Option<f64>,
}

#[derive(Default)]
struct YearAccumulator {
    official: f64,
    unofficial: f64,
    count: usize,
}

/// Average quotations per year, then take relative year-over-year changes.
/// Output is sorted by year.
pub fn exchange_deltas(records: &[ExchangeRecord]) -> Vec<ExchangeDelta> {
    let mut by_year: BTreeMap<i32, YearAccumulator> = BTreeMap::new();

    for record in records {
        let acc = by_year.entry(record.year).or_default();
        acc.official += record.official;
        acc.unofficial += record.unofficial;
        acc.count += 1;
    }

    let mut previous: Option<f64> = None;
    let mut deltas = Vec::with_capacity(by_year.len());

    for (year, acc) in by_year {
        let count = acc.count as f64;
        let official_avg = acc.official / count;
        let unofficial_avg = acc.unofficial / count;

        let change = previous.map(|prev| unofficial_avg - prev);
        deltas.push(ExchangeDelta {
            year,
            official_avg,
            unofficial_avg,
            delta_unofficial: ratio(change, Some(unofficial_avg)),
        });

        previous = Some(unofficial_avg);
    }

    debug!(years = deltas.len(), "computed exchange-rate deltas");

    deltas
}

// ============================================================================
// TESTS
// ============================================================================
