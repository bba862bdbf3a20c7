//! Error types for task set and routing operations

use thiserror::Error;

/// Task management errors
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Invalid nexus: {0}")]
    InvalidNexus(String),

    #[error("Invalid sense data: {0}")]
    InvalidSense(String),
}

/// Result type for task management operations
pub type TaskResult<T> = Result<T, TaskError>;
