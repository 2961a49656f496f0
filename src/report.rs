// 📝 Report Writer - elasticity summary + top-N tables to disk
//
// Both tables are serialized in memory, staged as temp files, then renamed into place.
// Undefined values become empty CSV cells or JSON nulls.

use crate::error::{ElasticityError, Result};
use crate::pipeline::{AnalysisReport, AnalysisSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected csv or json)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: OutputFormat::default(),
        }
    }
}

/// Paths of the two files produced for one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenReport {
    pub elasticity_path: PathBuf,
    pub top_path: PathBuf,
}

pub fn write_report(
    report: &AnalysisReport,
    spec: &AnalysisSpec,
    options: &OutputOptions,
) -> Result<WrittenReport> {
    let (elasticity_bytes, top_bytes) = match options.format {
        OutputFormat::Csv => (to_csv(&report.elasticity)?, to_csv(&report.top)?),
        OutputFormat::Json => (to_json(&report.elasticity)?, to_json(&report.top)?),
    };

    let dir = &options.output_dir;
    fs::create_dir_all(dir).map_err(|source| ElasticityError::OutputWrite {
        path: dir.clone(),
        source,
    })?;

    let ext = options.format.extension();
    let written = WrittenReport {
        elasticity_path: dir.join(format!("{}.{}", spec.elasticity_stem(), ext)),
        top_path: dir.join(format!("{}.{}", spec.top_stem(), ext)),
    };

    commit(&[
        (&written.elasticity_path, &elasticity_bytes),
        (&written.top_path, &top_bytes),
    ])?;

    info!(
        name = %report.name,
        dir = %dir.display(),
        "elasticity results saved"
    );

    Ok(written)
}

/// Write every file or none of them.
///
/// Contents go to hidden temp files next to their targets, then get renamed
/// into place. Any failure removes what this call already put on disk.
fn commit(files: &[(&PathBuf, &Vec<u8>)]) -> Result<()> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());

    for (target, bytes) in files {
        let tmp = staging_path(target);
        if let Err(e) = write_file(&tmp, bytes) {
            discard(&staged);
            return Err(e);
        }
        staged.push(tmp);
    }

    // A directory squatting on a target would fail the rename half way
    for (target, _) in files {
        if target.is_dir() {
            discard(&staged);
            return Err(ElasticityError::OutputWrite {
                path: target.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "destination is a directory"),
            });
        }
    }

    for (idx, ((target, _), tmp)) in files.iter().zip(&staged).enumerate() {
        if let Err(source) = fs::rename(tmp, target) {
            let placed: Vec<PathBuf> = files[..idx].iter().map(|(t, _)| t.to_path_buf()).collect();
            discard(&placed);
            discard(&staged[idx..]);
            return Err(ElasticityError::OutputWrite {
                path: target.to_path_buf(),
                source,
            });
        }
    }

    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to clean up partial output");
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| ElasticityError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// An empty table yields an empty file (csv emits headers on the first row)
fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    wtr.into_inner()
        .map_err(|e| ElasticityError::Csv(csv::Error::from(e.into_error())))
}

fn to_json<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(rows)?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elasticity::ElasticityRow;
    use crate::records::Dimension;
    use chrono::Utc;

    fn report() -> AnalysisReport {
        AnalysisReport {
            name: "Export_HS2".to_string(),
            elasticity: vec![
                ElasticityRow {
                    year: 2020,
                    elasticity: None,
                    contributors: 0,
                },
                ElasticityRow {
                    year: 2021,
                    elasticity: Some(0.5),
                    contributors: 2,
                },
            ],
            top: vec![],
            years_without_exchange: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_csv_undefined_is_empty_cell() {
        let bytes = to_csv(&report().elasticity).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "year,elasticity,contributors\n2020,,0\n2021,0.5,2\n");
    }

    #[test]
    fn test_json_undefined_is_null() {
        let bytes = to_json(&report().elasticity).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value[0]["elasticity"].is_null());
        assert_eq!(value[1]["elasticity"], 0.5);
    }

    #[test]
    fn test_write_report_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let options = OutputOptions {
            output_dir: dir.path().join("nested").join("results"),
            format: OutputFormat::Csv,
        };
        let spec = AnalysisSpec::new("Export_HS2", Dimension::code(2).unwrap());

        let written = write_report(&report(), &spec, &options).unwrap();

        assert!(written
            .elasticity_path
            .ends_with("nested/results/Elasticity_Analysis_Export_HS2.csv"));
        assert!(written.top_path.ends_with("Top_10_Elasticity_Export_HS2.csv"));
        assert!(written.elasticity_path.exists());
        assert!(written.top_path.exists());
    }

    #[test]
    fn test_unwritable_destination_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"not a directory").unwrap();

        let options = OutputOptions {
            output_dir: blocker.join("results"),
            format: OutputFormat::Json,
        };
        let spec = AnalysisSpec::new("Import", Dimension::Country);

        let err = write_report(&report(), &spec, &options).unwrap_err();
        assert!(matches!(err, ElasticityError::OutputWrite { .. }));
    }

    #[test]
    fn test_failed_second_file_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Top_10_Elasticity_X.csv")).unwrap();

        let options = OutputOptions {
            output_dir: dir.path().to_path_buf(),
            format: OutputFormat::Csv,
        };
        let spec = AnalysisSpec::new("X", Dimension::code(2).unwrap());

        let err = write_report(&report(), &spec, &options).unwrap_err();

        assert!(matches!(err, ElasticityError::OutputWrite { .. }));
        assert!(!dir.path().join("Elasticity_Analysis_X.csv").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("Top_10_Elasticity_X.csv")]);
    }

    #[test]
    fn test_rewrite_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let options = OutputOptions {
            output_dir: dir.path().to_path_buf(),
            format: OutputFormat::Csv,
        };
        let spec = AnalysisSpec::new("X", Dimension::code(2).unwrap());
        fs::write(dir.path().join("Elasticity_Analysis_X.csv"), "stale").unwrap();

        let written = write_report(&report(), &spec, &options).unwrap();

        let text = fs::read_to_string(&written.elasticity_path).unwrap();
        assert!(text.starts_with("year,elasticity,contributors"));
        assert!(!dir.path().join(".Elasticity_Analysis_X.csv.tmp").exists());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}
