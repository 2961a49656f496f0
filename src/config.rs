// 🗂️ Run Configuration - batch of analyses as data
// Loaded from a JSON file; relative input paths resolve against the file's directory.

use crate::elasticity::UndefinedPolicy;
use crate::error::{ElasticityError, Result};
use crate::pipeline::AnalysisSpec;
use crate::records::Dimension;
use crate::report::{OutputFormat, OutputOptions, DEFAULT_OUTPUT_DIR};
use crate::top_n::DEFAULT_TOP_N;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Code analyses without an explicit level default to HS2
pub const DEFAULT_DIGIT: u32 = 2;

// ============================================================================
// CONFIG TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    Code,
    Country,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Label embedded in output names
    pub name: String,

    /// Trade CSV for this analysis
    pub trade: PathBuf,

    pub dimension: DimensionKind,

    /// Truncation level, code dimension only
    #[serde(default)]
    pub digit: Option<u32>,

    /// Overrides the run-wide `top_n`
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub policy: UndefinedPolicy,

    /// Exchange-rate CSV shared by every analysis
    pub exchange: PathBuf,

    pub analyses: Vec<AnalysisConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// A validated analysis, ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAnalysis {
    pub spec: AnalysisSpec,
    pub trade_path: PathBuf,
}

// ============================================================================
// LOADING & VALIDATION
// ============================================================================

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ElasticityError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_inputs(base);
        }
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_inputs(&mut self, base: &Path) {
        if self.exchange.is_relative() {
            self.exchange = base.join(&self.exchange);
        }
        for analysis in &mut self.analyses {
            if analysis.trade.is_relative() {
                analysis.trade = base.join(&analysis.trade);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.analyses.is_empty() {
            return Err(invalid("no analyses configured"));
        }
        if self.top_n == 0 {
            return Err(invalid("top_n must be at least 1"));
        }

        let mut names = HashSet::new();
        for analysis in &self.analyses {
            if analysis.name.trim().is_empty() {
                return Err(invalid("analysis name must not be empty"));
            }
            if !names.insert(analysis.name.as_str()) {
                return Err(invalid(&format!("duplicate analysis name '{}'", analysis.name)));
            }
            if analysis.top_n == Some(0) {
                return Err(invalid(&format!("{}: top_n must be at least 1", analysis.name)));
            }
            if analysis.dimension == DimensionKind::Country && analysis.digit.is_some() {
                return Err(invalid(&format!(
                    "{}: digit only applies to the code dimension",
                    analysis.name
                )));
            }
            analysis.dimension()?;
        }

        Ok(())
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            output_dir: self.output_dir.clone(),
            format: self.format,
        }
    }

    /// One planned analysis per configured entry, in file order
    pub fn plan(&self) -> Result<Vec<PlannedAnalysis>> {
        self.analyses
            .iter()
            .map(|analysis| {
                let spec = AnalysisSpec::new(&analysis.name, analysis.dimension()?)
                    .with_top_n(analysis.top_n.unwrap_or(self.top_n))
                    .with_policy(self.policy);
                Ok(PlannedAnalysis {
                    spec,
                    trade_path: analysis.trade.clone(),
                })
            })
            .collect()
    }
}

impl AnalysisConfig {
    pub fn dimension(&self) -> Result<Dimension> {
        match self.dimension {
            DimensionKind::Code => Dimension::code(self.digit.unwrap_or(DEFAULT_DIGIT)),
            DimensionKind::Country => Ok(Dimension::Country),
        }
    }
}

fn invalid(message: &str) -> ElasticityError {
    ElasticityError::InvalidConfig(message.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
