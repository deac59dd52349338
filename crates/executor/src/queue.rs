use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actionhub_action::{ActionError, ExecutionQueue};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ProcessQueueConfig;
use crate::error::SubprocessError;

/// Runs jobs in fresh worker processes, at most
/// [`ProcessQueueConfig::max_concurrent`] at a time.
///
/// Jobs are admitted in submission order. Each job forks one worker, writes
/// the job line to its stdin, and waits for exactly one response line on its
/// stdout. The worker is killed once it has answered, failed, or timed out,
/// and only then is its slot released.
pub struct ProcessQueue {
    config: ProcessQueueConfig,
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
}

impl ProcessQueue {
    pub fn new(config: ProcessQueueConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            semaphore,
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ProcessQueueConfig {
        &self.config
    }

    /// Jobs submitted but not yet running.
    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Run `job` in a worker and return the message it sent back.
    pub async fn run_job(&self, job: String) -> Result<serde_json::Value, SubprocessError> {
        let waiting = WaitingGuard::enter(&self.waiting);
        info!(queue_depth = waiting.depth, "job enqueued");

        // Tokio's semaphore is fair, so waiters are admitted in FIFO order.
        let permit = self.semaphore.acquire().await;
        drop(waiting);
        let _permit = permit.map_err(|_| SubprocessError::QueueClosed)?;

        self.run_worker(&job).await
    }

    async fn run_worker(&self, job: &str) -> Result<serde_json::Value, SubprocessError> {
        let worker = &self.config.worker;
        let mut child = Command::new(&worker.program)
            .args(&worker.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(SubprocessError::Spawn)?;
        let pid = child.id();
        info!(pid, "worker spawned");

        // One deadline covers both the exchange and reaping the worker.
        let deadline = Instant::now() + self.config.job_timeout;
        let exchanged = tokio::time::timeout_at(deadline, exchange(&mut child, job)).await;

        match exchanged {
            Ok(Ok(Some(line))) => {
                kill(&mut child, pid).await;
                serde_json::from_str(&line)
                    .map_err(|e| SubprocessError::InvalidResponse(e.to_string()))
            }
            Ok(Ok(None)) => match tokio::time::timeout_at(deadline, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    let (code, signal) = (status.code(), exit_signal(status));
                    warn!(pid, code, signal, "worker exited without a response");
                    Err(SubprocessError::ExitedWithoutResponse { code, signal })
                }
                Err(_elapsed) => {
                    warn!(pid, timeout = ?self.config.job_timeout, "killing silent worker after job timeout");
                    kill(&mut child, pid).await;
                    Err(SubprocessError::Timeout(self.config.job_timeout))
                }
            },
            Ok(Err(e)) => {
                warn!(pid, error = %e, "worker I/O failed");
                kill(&mut child, pid).await;
                Err(SubprocessError::Io(e))
            }
            Err(_elapsed) => {
                warn!(pid, timeout = ?self.config.job_timeout, "killing worker after job timeout");
                kill(&mut child, pid).await;
                Err(SubprocessError::Timeout(self.config.job_timeout))
            }
        }
    }
}

/// Counts a job as queued until it is admitted or its caller goes away.
struct WaitingGuard<'a> {
    waiting: &'a AtomicUsize,
    depth: usize,
}

impl<'a> WaitingGuard<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        let depth = waiting.fetch_add(1, Ordering::SeqCst) + 1;
        Self { waiting, depth }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Send `job` and read the first non-blank line the worker writes back.
///
/// `None` means the worker closed stdout without answering.
async fn exchange(child: &mut Child, job: &str) -> std::io::Result<Option<String>> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdin is not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdout is not piped"))?;

    let written = async {
        stdin.write_all(job.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.shutdown().await
    }
    .await;
    drop(stdin);
    match written {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("worker closed stdin before reading the job");
        }
        other => other?,
    }

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

async fn kill(child: &mut Child, pid: Option<u32>) {
    if let Err(e) = child.kill().await {
        debug!(pid, error = %e, "worker already gone");
        return;
    }
    info!(pid, "worker killed");
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

#[async_trait]
impl ExecutionQueue for ProcessQueue {
    async fn run(&self, job: String) -> Result<serde_json::Value, ActionError> {
        Ok(self.run_job(job).await?)
    }
}
