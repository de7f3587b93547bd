use thiserror::Error;

/// Failure taxonomy for the container runtime adapter.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine socket/API could not be reached. The monitoring loop skips
    /// its tick on this and retries on the next one.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    /// The target container or image is gone.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine rejected the operation; carries the engine's error text.
    #[error("runtime operation failed ({status:?}): {message}")]
    OperationFailed {
        status: Option<u16>,
        message: String,
    },
}

impl RuntimeError {
    /// True when the engine answered 304: the container is already in the
    /// requested state. Lifecycle operations are not idempotent at this
    /// layer, so callers decide whether that counts as success.
    pub fn already_in_target_state(&self) -> bool {
        matches!(
            self,
            RuntimeError::OperationFailed {
                status: Some(304),
                ..
            }
        )
    }
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => RuntimeError::OperationFailed {
                status: Some(status_code),
                message,
            },
            other => RuntimeError::Unavailable(other.to_string()),
        }
    }
}
