//! Domain error types.

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{self}")
    }
}

/// Top-level error type for ruletrader.
#[derive(Debug, thiserror::Error)]
pub enum RuletraderError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

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

    #[error("invalid action '{token}' (expected buy, sell, exit or hold)")]
    InvalidAction { token: String },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RuletraderError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        RuletraderError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&RuletraderError> for std::process::ExitCode {
    fn from(err: &RuletraderError) -> Self {
        let code: u8 = match err {
            RuletraderError::Io(_) | RuletraderError::Report { .. } => 1,
            RuletraderError::ConfigParse { .. }
            | RuletraderError::ConfigMissing { .. }
            | RuletraderError::ConfigInvalid { .. } => 2,
            RuletraderError::InvalidAction { .. } | RuletraderError::ConditionParse(_) => 4,
            RuletraderError::InvalidInput { .. }
            | RuletraderError::InsufficientData { .. }
            | RuletraderError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
