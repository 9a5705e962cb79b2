//! Unified error model for the bridge.
//! One enum covers every failure the translation/execution pipeline can
//! surface to the host UI: template resolution, backend execution, transport
//! IO, and internal invariant breaks. Serializable so callers can forward it
//! over their own wire unchanged.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// A template variable could not be resolved or the engine itself failed.
    Template { code: String, message: String },
    /// The backend reported an execution error for the batch. The message is
    /// passed through verbatim.
    Exec { code: String, message: String },
    /// Transport-level failure: connect, send, decode.
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Template { code, .. }
            | AppError::Exec { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Template { message, .. }
            | AppError::Exec { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn template<S: Into<String>>(code: S, msg: S) -> Self { AppError::Template { code: code.into(), message: msg.into() } }
    pub fn exec<S: Into<String>>(code: S, msg: S) -> Self { AppError::Exec { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// True when retrying the same request could plausibly succeed (transport
    /// trouble), false for errors the descriptor or pipeline text caused.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Io { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as transport IO unless downcasted elsewhere
        AppError::Io { code: "io_error".into(), message: format!("{err:#}") }
    }
}
