pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;
pub mod report;

pub use commands::analytics::MetricsAggregator;
pub use commands::db::{MetricsStore, SqliteStore};
pub use commands::extract::{BatchPolicy, BatchSummary, MetricExtractor};
pub use commands::oracle::{HttpOracle, OracleError, ScoringOracle, ScoringPrompt};
pub use commands::pipeline::Pipeline;
pub use error::{PipelineError, PipelineResult};
pub use report::{LogReporter, Reporter};

/// Install `env_logger` for binaries embedding the pipeline.
///
/// Honors `RUST_LOG`, defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
