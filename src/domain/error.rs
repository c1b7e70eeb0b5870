//! Domain error types.

/// Top-level error type for the breakout strategy.
#[derive(Debug, thiserror::Error)]
pub enum BreakoutError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data: need {needed} bars, have {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("invalid breakout window of {len} bars: at least one prior bar is required")]
    InvalidWindow { len: usize },

    #[error("invalid {series} price: {value}")]
    InvalidPrice { series: &'static str, value: f64 },

    #[error("order rejected: {reason}")]
    Order { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BreakoutError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BreakoutError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config_missing(section: &str, key: &str) -> Self {
        BreakoutError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&BreakoutError> for std::process::ExitCode {
    fn from(err: &BreakoutError) -> Self {
        let code: u8 = match err {
            BreakoutError::Io(_) | BreakoutError::Order { .. } => 1,
            BreakoutError::ConfigParse { .. }
            | BreakoutError::ConfigMissing { .. }
            | BreakoutError::ConfigInvalid { .. } => 2,
            BreakoutError::Data { .. }
            | BreakoutError::NoData { .. }
            | BreakoutError::InsufficientData { .. } => 5,
            BreakoutError::InvalidWindow { .. } | BreakoutError::InvalidPrice { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
