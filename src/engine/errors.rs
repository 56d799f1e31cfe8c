use thiserror::Error;

use crate::engine::types::StateId;

/// First failing task of a work list, with the error its action raised
#[derive(Debug, Error)]
#[error("task '{task_name}' failed: {error}")]
pub struct TaskFailure {
    pub task_name: String,
    #[source]
    pub error: anyhow::Error,
}

impl TaskFailure {
    pub fn new(task_name: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            task_name: task_name.into(),
            error,
        }
    }

    pub fn into_error(self) -> anyhow::Error {
        self.error
    }
}

/// Faults that abort a run instead of producing a numeric outcome
#[derive(Debug, Error)]
pub enum EngineError {
    /// The error handler itself failed; the raised error is passed through as-is.
    #[error(transparent)]
    HandlerFault(anyhow::Error),
    #[error("state '{0}' is not defined in the machine")]
    UnknownState(StateId),
    #[error("invalid machine configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn is_handler_fault(&self) -> bool {
        matches!(self, EngineError::HandlerFault(_))
    }
}
