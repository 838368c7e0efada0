//! Domain error types.

/// A malformed strategy block, identified by its `id` (or `#<index>` when it has none).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid block {block}: {reason}")]
pub struct ValidationError {
    pub block: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(block: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for algoedge.
#[derive(Debug, thiserror::Error)]
pub enum AlgoedgeError {
    #[error("strategy parse error: {reason}")]
    StrategyParse { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("price series is empty")]
    EmptySeries,

    #[error("price series timestamps are not strictly increasing at bar {index}")]
    NonMonotonic { index: usize },

    #[error("no data for {symbol} ({timeframe})")]
    NoData { symbol: String, timeframe: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("invalid parameter space: {reason}")]
    ParamSpace { reason: String },

    #[error("unknown objective metric '{name}'")]
    UnknownObjective { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to build worker pool: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AlgoedgeError> for std::process::ExitCode {
    fn from(err: &AlgoedgeError) -> Self {
        let code: u8 = match err {
            AlgoedgeError::Io(_) | AlgoedgeError::Json(_) | AlgoedgeError::WorkerPool { .. } => 1,
            AlgoedgeError::ConfigParse { .. }
            | AlgoedgeError::ConfigMissing { .. }
            | AlgoedgeError::ConfigInvalid { .. } => 2,
            AlgoedgeError::EmptySeries
            | AlgoedgeError::NonMonotonic { .. }
            | AlgoedgeError::NoData { .. }
            | AlgoedgeError::DataSource { .. } => 3,
            AlgoedgeError::StrategyParse { .. } | AlgoedgeError::Validation(_) => 4,
            AlgoedgeError::ParamSpace { .. } | AlgoedgeError::UnknownObjective { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
