use std::time::Duration;

use actionhub_action::ActionError;
use thiserror::Error;

/// Errors that can occur while running a job in a worker process.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The worker exited before writing a response.
    #[error("worker exited without a response (code: {code:?}, signal: {signal:?})")]
    ExitedWithoutResponse {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("worker sent an invalid response: {0}")]
    InvalidResponse(String),

    #[error("worker killed after timeout of {0:?}")]
    Timeout(Duration),

    #[error("execution queue is closed")]
    QueueClosed,
}

impl From<SubprocessError> for ActionError {
    fn from(err: SubprocessError) -> Self {
        Self::Subprocess(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SubprocessError::ExitedWithoutResponse {
            code: Some(3),
            signal: None,
        };
        assert_eq!(
            err.to_string(),
            "worker exited without a response (code: Some(3), signal: None)"
        );
        let err = SubprocessError::Timeout(Duration::from_millis(500));
        assert_eq!(err.to_string(), "worker killed after timeout of 500ms");
    }

    #[test]
    fn converts_to_subprocess_action_error() {
        let err: ActionError = SubprocessError::QueueClosed.into();
        assert!(matches!(err, ActionError::Subprocess(ref m) if m == "execution queue is closed"));
        assert!(!err.is_user_facing());
    }
}
