// 📦 Input data model - trade rows, exchange quotations, grouping keys
// Plus the undefined-aware division every later stage relies on

use crate::error::{ElasticityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification codes arrive at HS-6 granularity
pub const HS_CODE_WIDTH: u32 = 6;

// ============================================================================
// RAW RECORDS
// ============================================================================

/// One trade observation. Many rows may share a (year, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub year: i32,

    /// Product classification code (HS-6)
    #[serde(default, deserialize_with = "code_cell")]
    pub code: Option<i64>,

    /// Partner country
    #[serde(default)]
    pub country: Option<String>,

    /// Trade value in dollars
    pub dollar: f64,
}

impl TradeRecord {
    pub fn by_code(year: i32, code: i64, dollar: f64) -> Self {
        TradeRecord {
            year,
            code: Some(code),
            country: None,
            dollar,
        }
    }

    pub fn by_country(year: i32, country: &str, dollar: f64) -> Self {
        TradeRecord {
            year,
            code: None,
            country: Some(country.to_string()),
            dollar,
        }
    }
}

/// Codes may be exported as floats (`123456.0`); only integral values are codes
fn code_cell<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let cell: Option<String> = Option::deserialize(deserializer)?;
    let text = match cell.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };

    if let Ok(code) = text.parse::<i64>() {
        return Ok(Some(code));
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(D::Error::custom(format!(
            "invalid classification code '{}'",
            text
        ))),
    }
}

/// One exchange-rate quotation. Several per year are averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub year: i32,
    pub official: f64,
    pub unofficial: f64,
}

impl ExchangeRecord {
    pub fn new(year: i32, official: f64, unofficial: f64) -> Self {
        ExchangeRecord {
            year,
            official,
            unofficial,
        }
    }
}

// ============================================================================
// GROUPING DIMENSION
// ============================================================================

/// Category value a trade row is grouped under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryKey {
    Code(i64),
    Country(String),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Code(code) => write!(f, "{}", code),
            CategoryKey::Country(country) => write!(f, "{}", country),
        }
    }
}

/// Which column of a trade row the analysis groups by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Product code truncated to `digit` leading digits
    Code { digit: u32 },

    /// Partner country as-is
    Country,
}

impl Dimension {
    /// Validated code dimension
    pub fn code(digit: u32) -> Result<Self> {
        check_digit(digit)?;
        Ok(Dimension::Code { digit })
    }

    /// Column the trade table must carry for this dimension
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Code { .. } => "code",
            Dimension::Country => "country",
        }
    }

    pub fn is_country(&self) -> bool {
        matches!(self, Dimension::Country)
    }

    /// Extract the grouping key, truncating codes to the requested level
    pub fn key_for(&self, record: &TradeRecord) -> Result<CategoryKey> {
        match self {
            Dimension::Code { digit } => {
                let code = record.code.ok_or(ElasticityError::MissingCategory {
                    year: record.year,
                    field: "code",
                })?;
                Ok(CategoryKey::Code(truncate_code(code, *digit)?))
            }
            Dimension::Country => {
                let country = record
                    .country
                    .as_ref()
                    .ok_or(ElasticityError::MissingCategory {
                        year: record.year,
                        field: "country",
                    })?;
                Ok(CategoryKey::Country(country.clone()))
            }
        }
    }
}

fn check_digit(digit: u32) -> Result<()> {
    if digit == 0 || digit > HS_CODE_WIDTH {
        return Err(ElasticityError::InvalidDigit {
            digit,
            max: HS_CODE_WIDTH,
        });
    }
    Ok(())
}

/// Coarsen an HS-6 code to its leading `digit` digits (integer division)
pub fn truncate_code(code: i64, digit: u32) -> Result<i64> {
    check_digit(digit)?;
    Ok(code / 10_i64.pow(HS_CODE_WIDTH - digit))
}

// ============================================================================
// UNDEFINED-AWARE ARITHMETIC
// ============================================================================

/// Division that yields `None` instead of inf/NaN.
/// Undefined operands, a zero denominator and non-finite results are all undefined.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (num, den) = (numerator?, denominator?);
    if den == 0.0 {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}

// ============================================================================
// TESTS
// ============================================================================
