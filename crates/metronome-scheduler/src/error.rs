use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression failed to parse at registration time.
    #[error("Invalid cron expression {expr:?}: {reason}")]
    InvalidCronExpression { expr: String, reason: String },

    /// A task with the same name is already registered.
    #[error("Duplicate task: {name}")]
    DuplicateTask { name: String },

    /// Configuration file / environment extraction failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
