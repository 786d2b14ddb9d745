use thiserror::Error;

/// Recoverable failures of the session core. Nothing here terminates the
/// hosting application; callers either retry, show a notice, or ignore.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("already at the first step")]
    AtFirstStep,

    #[error("already at the last step")]
    AtLastStep,

    #[error("no active session")]
    NoActiveSession,

    #[error("invalid activity reference: {0}")]
    InvalidActivity(String),

    #[error("step index {index} out of range for {total} steps")]
    StepOutOfRange { index: usize, total: usize },
}
