//! Crate-wide error types.

use thiserror::Error;

use crate::lifecycle::Action;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Truncated record: field `{field}` needs {needed} bytes at offset {offset}, {available} available")]
    TruncatedRecord {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid status byte: {0}")]
    InvalidStatus(u8),

    #[error("Invalid UTF-8 in field `{field}`")]
    InvalidEncoding { field: &'static str },

    #[error("Field `{field}` is {len} bytes, limit is 65535")]
    FieldTooLarge { field: &'static str, len: usize },

    #[error("Cannot {action}{}: {reason}", task_label(.task_id))]
    PreconditionViolation {
        action: Action,
        task_id: Option<u64>,
        reason: String,
    },

    #[error("Task {0} not found")]
    TaskNotFound(u64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl BoardError {
    /// Codec failures describe bad bytes on the ledger and are never worth retrying.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            BoardError::MalformedAddress(_)
                | BoardError::TruncatedRecord { .. }
                | BoardError::InvalidStatus(_)
                | BoardError::InvalidEncoding { .. }
                | BoardError::FieldTooLarge { .. }
        )
    }

    pub(crate) fn precondition(action: Action, task_id: Option<u64>, reason: impl Into<String>) -> Self {
        BoardError::PreconditionViolation {
            action,
            task_id,
            reason: reason.into(),
        }
    }
}

fn task_label(task_id: &Option<u64>) -> String {
    match task_id {
        Some(id) => format!(" task {id}"),
        None => " task".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
