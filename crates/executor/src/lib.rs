pub mod config;
pub mod error;
pub mod queue;
pub mod worker;

pub use config::{ProcessQueueConfig, WorkerCommand};
pub use error::SubprocessError;
pub use queue::ProcessQueue;
pub use worker::{error_string, run_worker};
