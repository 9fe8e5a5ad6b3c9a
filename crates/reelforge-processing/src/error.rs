use thiserror::Error;

/// Failure of an external processing tool.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to execute {tool}: {message}")]
    Spawn { tool: &'static str, message: String },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: &'static str, secs: u64 },

    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: &'static str, stderr: String },

    #[error("Invalid {tool} output: {message}")]
    InvalidOutput { tool: &'static str, message: String },
}
