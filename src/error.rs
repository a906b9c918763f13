use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the task backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("login response carried no token")]
    MissingToken,
}

impl ApiError {
    /// 401/403 from the backend: the stored session is no longer accepted.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

/// Which level of the task tree an index addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Page,
    Step,
    Pair,
    Variable,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::Page => "page",
            Level::Step => "step",
            Level::Pair => "key-value pair",
            Level::Variable => "variable",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("{level} index {index} out of range (len {len})")]
    IndexOutOfRange { level: Level, index: usize, len: usize },
}

/// Why a save (or a JSON → form toggle) did not go through.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("task name is required")]
    MissingName,

    #[error("invalid JSON at line {line}, column {column}: {message}")]
    InvalidJson { line: usize, column: usize, message: String },

    #[error("JSON does not describe a task: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SaveError {
    /// Classify a `serde_json` failure on the JSON buffer. Syntax errors and
    /// shape errors are reported differently so the user knows what to fix.
    pub fn from_json(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Data => SaveError::InvalidPayload(err.to_string()),
            _ => SaveError::InvalidJson {
                line: err.line(),
                column: err.column(),
                message: err.to_string(),
            },
        }
    }

    /// Errors the user can fix in the editor without leaving it.
    pub fn is_correctable(&self) -> bool {
        matches!(
            self,
            SaveError::MissingName | SaveError::InvalidJson { .. } | SaveError::InvalidPayload(_)
        )
    }
}
