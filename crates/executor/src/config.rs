use std::path::PathBuf;
use std::time::Duration;

/// The command that starts one worker process.
///
/// The worker reads one job line from stdin and writes one response line to
/// stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-run the current executable with the `worker` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["worker".to_owned()]))
    }
}

/// Configuration for the [`ProcessQueue`](crate::ProcessQueue).
///
/// # Examples
///
/// ```
/// use actionhub_executor::{ProcessQueueConfig, WorkerCommand};
///
/// let config = ProcessQueueConfig::new(WorkerCommand::new("/usr/bin/actionhub-server", vec!["worker".into()]));
/// assert_eq!(config.max_concurrent, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ProcessQueueConfig {
    /// Maximum number of worker processes alive at once. Enforced via a
    /// [`tokio::sync::Semaphore`].
    pub max_concurrent: usize,
    /// A worker still running after this long is killed.
    pub job_timeout: Duration,
    pub worker: WorkerCommand,
}

impl ProcessQueueConfig {
    pub const DEFAULT_MAX_CONCURRENT: usize = 1;
    pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

    pub fn new(worker: WorkerCommand) -> Self {
        Self {
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            job_timeout: Self::DEFAULT_JOB_TIMEOUT,
            worker,
        }
    }
}
