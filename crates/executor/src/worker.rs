use actionhub_action::{ActionError, ActionRegistry, WorkerJob, execute_direct};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::error::SubprocessError;

const UNNAMED_ERROR: &str = "Unnamed Error";

/// Worker-process side of the queue: read one [`WorkerJob`] line from
/// `input`, run it against `registry`, and write one response line to
/// `output`.
///
/// The job has already been validated by the hub, so the action is executed
/// directly. Any failure is written as `{"success": false, "message": ...}`.
pub async fn run_worker<R, W>(
    registry: &ActionRegistry,
    mut input: R,
    mut output: W,
) -> Result<(), SubprocessError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    input.read_line(&mut line).await?;

    let response = match serde_json::from_str::<WorkerJob>(&line) {
        Ok(job) => run_job(registry, job).await,
        Err(e) => {
            warn!(error = %e, "worker received an invalid job");
            failure(&format!("invalid job: {e}"))
        }
    };

    let mut encoded = serde_json::to_vec(&response)
        .map_err(|e| SubprocessError::InvalidResponse(e.to_string()))?;
    encoded.push(b'\n');
    output.write_all(&encoded).await?;
    output.flush().await?;
    Ok(())
}

async fn run_job(registry: &ActionRegistry, job: WorkerJob) -> serde_json::Value {
    let webhook_id = job.request.webhook_id.as_ref().map(|id| id.as_str());
    info!(
        action = %job.action_id,
        webhook_id,
        pid = std::process::id(),
        "worker executing action"
    );

    let result = match registry.find(&job.action_id, job.request.caller_version.as_ref()) {
        Ok(action) => execute_direct(action.as_ref(), &job.request).await,
        Err(e) => Err(e),
    };

    match result.and_then(|response| {
        serde_json::to_value(&response)
            .map_err(|e| ActionError::Configuration(format!("unserializable response: {e}")))
    }) {
        Ok(value) => value,
        Err(e) => {
            warn!(action = %job.action_id, webhook_id, error = %e, "worker action failed");
            failure(&error_string(&e))
        }
    }
}

/// Text reported for a failed job, never empty.
pub fn error_string(err: &ActionError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNNAMED_ERROR.to_owned()
    } else {
        message
    }
}

fn failure(message: &str) -> serde_json::Value {
    serde_json::json!({ "success": false, "message": message })
}
