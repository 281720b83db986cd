//! Error types for judge operations

use std::io;
use thiserror::Error;

/// Result type for judge operations
pub type Result<T> = std::result::Result<T, JudgeError>;

/// Errors that can occur while preparing or supervising an evaluation.
///
/// None of these cross the evaluation boundary: the engine folds them into a
/// verdict. They surface directly only from the test-set tooling.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Syscall error: {0}")]
    Syscall(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Process monitoring error: {0}")]
    ProcessMonitoring(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No test set named \"{0}\"")]
    TestsetNotFound(String),

    #[error("No test {number} in test set \"{set}\"")]
    TestNotFound { set: String, number: u32 },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("{stage} script failed: {detail}")]
    Script { stage: String, detail: String },
}
