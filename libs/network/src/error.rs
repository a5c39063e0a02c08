//! Worker and connection errors
//!
//! Every run loop ends with an optional [`WorkerError`], the cause passed to
//! the close handler. `None` means a graceful close.

use message_pump::PumpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    /// The interruption signal was raised without the worker being closed
    #[error("Worker interrupted without being closed")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] PumpError),

    /// The run loop panicked
    #[error("Fatal worker failure: {0}")]
    Fatal(String),

    #[error("Teardown failed: {0}")]
    Teardown(String),

    #[error("Worker {0} was already started")]
    AlreadyStarted(String),

    #[error("Connection rejected by {connector}: {reason}")]
    Rejected { connector: String, reason: String },
}

impl WorkerError {
    /// Message of a caught panic payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        WorkerError::Fatal(message)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Fatal(_))
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
