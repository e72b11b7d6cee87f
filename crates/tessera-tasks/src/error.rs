//! Error types for background task execution.

use thiserror::Error;

/// Result type for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// A background task that did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task returned an error.
    #[error("task {index} failed: {source}")]
    Failed {
        /// Position of the task in its batch.
        index: usize,
        /// The error the task returned.
        #[source]
        source: anyhow::Error,
    },

    /// The task panicked.
    #[error("task {index} panicked: {message}")]
    Panicked {
        /// Position of the task in its batch.
        index: usize,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The blocking pool refused or cancelled the task.
    #[error("task {index} could not run on the blocking pool: {reason}")]
    Join {
        /// Position of the task in its batch.
        index: usize,
        /// Why the join failed.
        reason: String,
    },
}

impl TaskError {
    /// Create a failed error.
    pub fn failed(index: usize, source: anyhow::Error) -> Self {
        Self::Failed { index, source }
    }

    /// Create a panicked error from a panic payload.
    pub fn panicked(index: usize, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { index, message }
    }

    /// Create a join error.
    pub fn join(index: usize, reason: impl Into<String>) -> Self {
        Self::Join {
            index,
            reason: reason.into(),
        }
    }

    /// Returns the position of the failed task.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Panicked { index, .. } | Self::Join { index, .. } => {
                *index
            }
        }
    }
}
