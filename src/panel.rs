// 🧱 Panel Densifier - sparse trade rows → complete year × category grid
//
// Every (year, category) pair in the Cartesian product of observed years and
// observed categories appears exactly once. Absent cells hold 0.0 dollars.
// Yearly total trade is recomputed from the grid, never read from the source.

use crate::error::Result;
use crate::records::{CategoryKey, Dimension, TradeRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// ============================================================================
// DENSE PANEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseRow {
    pub year: i32,
    pub category: CategoryKey,

    /// Summed trade for this (year, category); 0.0 when unobserved
    pub dollar: f64,

    /// Sum of `dollar` over every category of this year
    pub total_trade: f64,
}

/// Year-major, category-minor grid. Both axes are ascending.
#[derive(Debug, Clone, Default)]
pub struct DensePanel {
    pub rows: Vec<DenseRow>,
    pub years: Vec<i32>,
    pub categories: Vec<CategoryKey>,
}

impl DensePanel {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total trade of a year, if the year is part of the panel
    pub fn total_for(&self, year: i32) -> Option<f64> {
        let idx = self.years.binary_search(&year).ok()?;
        self.rows
            .get(idx * self.categories.len())
            .map(|row| row.total_trade)
    }

    /// Rows of one year, in category order
    pub fn year_rows(&self, year: i32) -> &[DenseRow] {
        match self.years.binary_search(&year) {
            Ok(idx) => {
                let width = self.categories.len();
                &self.rows[idx * width..(idx + 1) * width]
            }
            Err(_) => &[],
        }
    }
}

// ============================================================================
// DENSIFY
// ============================================================================

/// Aggregate trade rows by (year, category) and expand to the full grid.
///
/// Codes are truncated before aggregation, so several HS-6 codes collapse
/// into one coarser category.
pub fn densify(records: &[TradeRecord], dimension: &Dimension) -> Result<DensePanel> {
    let mut sums: BTreeMap<(i32, CategoryKey), f64> = BTreeMap::new();

    for record in records {
        let key = dimension.key_for(record)?;
        *sums.entry((record.year, key)).or_insert(0.0) += record.dollar;
    }

    let years: Vec<i32> = sums
        .keys()
        .map(|(year, _)| *year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let categories: Vec<CategoryKey> = sums
        .keys()
        .map(|(_, category)| category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rows = Vec::with_capacity(years.len() * categories.len());

    for &year in &years {
        let start = rows.len();

        for category in &categories {
            let dollar = sums
                .get(&(year, category.clone()))
                .copied()
                .unwrap_or(0.0);
            rows.push(DenseRow {
                year,
                category: category.clone(),
                dollar,
                total_trade: 0.0,
            });
        }

        let total: f64 = rows[start..].iter().map(|row| row.dollar).sum();
        for row in &mut rows[start..] {
            row.total_trade = total;
        }
    }

    debug!(
        records = records.len(),
        years = years.len(),
        categories = categories.len(),
        cells = rows.len(),
        "densified trade panel"
    );

    Ok(DensePanel {
        rows,
        years,
        categories,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TradeRecord> {
        vec![
            TradeRecord::by_code(2020, 110000, 100.0),
            TradeRecord::by_code(2020, 119999, 50.0), // same HS2 as above
            TradeRecord::by_code(2020, 220000, 30.0),
            TradeRecord::by_code(2021, 330000, 40.0), // 33 only appears in 2021
        ]
    }

    #[test]
    fn test_densify_fills_missing_cells_with_zero() {
        let panel = densify(&sample(), &Dimension::code(2).unwrap()).unwrap();

        assert_eq!(panel.years, vec![2020, 2021]);
        assert_eq!(
            panel.categories,
            vec![CategoryKey::Code(11), CategoryKey::Code(22), CategoryKey::Code(33)]
        );
        assert_eq!(panel.len(), 6);

        let y2021 = panel.year_rows(2021);
        assert_eq!(y2021[0].dollar, 0.0);
        assert_eq!(y2021[1].dollar, 0.0);
        assert_eq!(y2021[2].dollar, 40.0);
    }

    #[test]
    fn test_densify_sums_truncated_codes() {
        let panel = densify(&sample(), &Dimension::code(2).unwrap()).unwrap();
        let y2020 = panel.year_rows(2020);
        assert_eq!(y2020[0].category, CategoryKey::Code(11));
        assert_eq!(y2020[0].dollar, 150.0);
    }

    #[test]
    fn test_total_trade_attached_to_every_row() {
        let panel = densify(&sample(), &Dimension::code(2).unwrap()).unwrap();

        assert_eq!(panel.total_for(2020), Some(180.0));
        assert_eq!(panel.total_for(2021), Some(40.0));
        assert_eq!(panel.total_for(1999), None);
        assert!(panel
            .year_rows(2020)
            .iter()
            .all(|row| row.total_trade == 180.0));
    }

    #[test]
    fn test_full_code_level_keeps_codes_apart() {
        let panel = densify(&sample(), &Dimension::code(6).unwrap()).unwrap();
        assert_eq!(panel.categories.len(), 4);
        assert_eq!(panel.len(), 8);
    }

    #[test]
    fn test_densify_country_dimension() {
        let records = vec![
            TradeRecord::by_country(2019, "Peru", 5.0),
            TradeRecord::by_country(2019, "Peru", 5.0),
            TradeRecord::by_country(2020, "Chile", 7.0),
        ];
        let panel = densify(&records, &Dimension::Country).unwrap();

        assert_eq!(panel.len(), 4);
        let y2019 = panel.year_rows(2019);
        assert_eq!(y2019[0].category, CategoryKey::Country("Chile".into()));
        assert_eq!(y2019[0].dollar, 0.0);
        assert_eq!(y2019[1].dollar, 10.0);
    }

    #[test]
    fn test_densify_empty_input() {
        let panel = densify(&[], &Dimension::Country).unwrap();
        assert!(panel.is_empty());
        assert!(panel.years.is_empty());
    }

    #[test]
    fn test_densify_propagates_missing_category() {
        let records = vec![TradeRecord::by_code(2020, 123456, 1.0)];
        assert!(densify(&records, &Dimension::Country).is_err());
    }
}
