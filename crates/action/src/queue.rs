use actionhub_core::ActionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// A self-contained job handed to an isolated worker process.
///
/// Workers share no memory with the hub: they rebuild their own registry and
/// resolve `action_id` in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub action_id: String,
    pub request: ActionRequest,
}

impl WorkerJob {
    /// Tag `request` with the action it was routed to.
    pub fn new(action_id: impl Into<String>, mut request: ActionRequest) -> Self {
        let action_id = action_id.into();
        request.action_id = Some(action_id.clone());
        Self { action_id, request }
    }
}

/// Runs serialized [`WorkerJob`]s outside the hub process.
///
/// Resolves with the single message the worker sent back, or fails when the
/// worker could not produce one.
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
    async fn run(&self, job: String) -> Result<serde_json::Value, ActionError>;
}
