// 📂 Tabular readers - trade and exchange-rate CSV files
//
// Header names are matched case-insensitively (so `UnOfficial` == `unofficial`).
// A missing required column aborts the load before any row is read.

use crate::error::{ElasticityError, Result};
use crate::records::{Dimension, ExchangeRecord, TradeRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const TRADE_TABLE: &str = "trade";
pub const EXCHANGE_TABLE: &str = "exchange";

const EXCHANGE_COLUMNS: [&str; 3] = ["year", "official", "unofficial"];

/// Load trade rows; `year`, `dollar` and the dimension's column are required
pub fn load_trade_csv(path: &Path, dimension: &Dimension) -> Result<Vec<TradeRecord>> {
    let file = open(path)?;
    let records = read_trade(file, dimension)?;
    info!(path = %path.display(), rows = records.len(), "loaded trade table");
    Ok(records)
}

/// Load exchange-rate quotations; `year`, `official` and `unofficial` are required
pub fn load_exchange_csv(path: &Path) -> Result<Vec<ExchangeRecord>> {
    let file = open(path)?;
    let records = read_exchange(file)?;
    info!(path = %path.display(), rows = records.len(), "loaded exchange table");
    Ok(records)
}

/// The classification column the dimension does not group by is never parsed
pub fn read_trade<R: Read>(reader: R, dimension: &Dimension) -> Result<Vec<TradeRecord>> {
    let unused = match dimension {
        Dimension::Code { .. } => "country",
        Dimension::Country => "code",
    };
    read_table(
        reader,
        TRADE_TABLE,
        &["year", "dollar", dimension.column()],
        &[unused],
    )
}

pub fn read_exchange<R: Read>(reader: R) -> Result<Vec<ExchangeRecord>> {
    read_table(reader, EXCHANGE_TABLE, &EXCHANGE_COLUMNS, &[])
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ElasticityError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_table<R, T>(
    reader: R,
    table: &'static str,
    required: &[&str],
    skipped: &[&str],
) -> Result<Vec<T>>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = normalize_headers(rdr.headers()?);
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ElasticityError::MissingInputColumn {
                table,
                column: column.to_string(),
            });
        }
    }
    // Renamed headers match no field, so serde leaves those cells alone
    let headers: StringRecord = headers
        .iter()
        .map(|h| {
            if skipped.contains(&h) {
                format!("_skipped_{}", h)
            } else {
                h.to_string()
            }
        })
        .collect();
    rdr.set_headers(headers);

    let mut rows = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let row: T = result.map_err(|source| {
            // Fallback assumes one physical line per record after the header
            let line = source
                .position()
                .map(|pos| pos.line())
                .unwrap_or(line_num as u64 + 2);
            ElasticityError::Row {
                table,
                line,
                source,
            }
        })?;
        rows.push(row);
    }

    Ok(rows)
}

fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|name| name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
