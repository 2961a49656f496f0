// Trade Elasticity - Core Library
// Exposes the pipeline for the CLI runner and tests

pub mod error;
pub mod records;
pub mod panel;       // Panel Densifier
pub mod delta;       // Delta Calculator (trade + exchange)
pub mod elasticity;  // Elasticity Joiner
pub mod top_n;       // Top-N Selector
pub mod pipeline;
pub mod loader;
pub mod report;
pub mod config;
pub mod runner;

// Re-export commonly used types
pub use error::{ElasticityError, Result};
pub use records::{
    CategoryKey, Dimension, ExchangeRecord, TradeRecord,
    ratio, truncate_code, HS_CODE_WIDTH,
};
pub use panel::{densify, DensePanel, DenseRow};
pub use delta::{exchange_deltas, trade_deltas, DeltaRow, ExchangeDelta};
pub use elasticity::{aggregate, join, ElasticityRow, JoinedRow, UndefinedPolicy};
pub use top_n::{select_top_n, WeightedRow, DEFAULT_TOP_N};
pub use pipeline::{
    analyze, elasticity_analysis, elasticity_analysis_country,
    AnalysisReport, AnalysisSpec,
};
pub use loader::{load_exchange_csv, load_trade_csv, read_exchange, read_trade};
pub use report::{write_report, OutputFormat, OutputOptions, WrittenReport, DEFAULT_OUTPUT_DIR};
pub use config::{AnalysisConfig, DimensionKind, PlannedAnalysis, RunConfig};
pub use runner::{run_all, run_one, AnalysisOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
