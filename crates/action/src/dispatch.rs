use actionhub_core::{ActionForm, ActionRequest, ActionResponse};
use tracing::{info, warn};

use crate::action::DynAction;
use crate::definition::ActionDefinition;
use crate::error::{ActionError, ValidationError};
use crate::queue::{ExecutionQueue, WorkerJob};

/// Check `request` against everything `definition` declares.
pub fn validate_request(
    definition: &ActionDefinition,
    request: &ActionRequest,
) -> Result<(), ValidationError> {
    let Some(requested) = request.action_type.as_deref() else {
        return Err(ValidationError::MissingType {
            supported: definition.supported_action_types.clone(),
        });
    };
    let supported = definition
        .supported_action_types
        .iter()
        .any(|t| t.as_str() == requested);
    if !supported {
        return Err(ValidationError::UnsupportedType {
            requested: requested.to_owned(),
            supported: definition.supported_action_types.clone(),
        });
    }
    check_required_params(definition, request)?;
    if definition.uses_streaming && request.attachment.is_none() && request.download_url().is_none()
    {
        return Err(ValidationError::StreamingMismatch);
    }
    Ok(())
}

/// Required parameters must be present and non-empty.
fn check_required_params(
    definition: &ActionDefinition,
    request: &ActionRequest,
) -> Result<(), ValidationError> {
    for param in definition.required_params() {
        let present = request
            .params
            .get(&param.name)
            .is_some_and(|value| !value.is_empty());
        if !present {
            return Err(ValidationError::MissingRequiredParam {
                name: param.name.clone(),
            });
        }
    }
    Ok(())
}

/// Validate `request` and run it.
///
/// Actions flagged `execute_in_own_process` go through `queue` when forking
/// is enabled and a queue is available; any failure on that path is reported
/// as a failed response. Otherwise the action runs in this process.
pub async fn validate_and_execute(
    action: &dyn DynAction,
    request: ActionRequest,
    queue: Option<&dyn ExecutionQueue>,
    forking_enabled: bool,
) -> Result<ActionResponse, ActionError> {
    if !action.has_execute() {
        return Err(ActionError::NoExecute);
    }
    let definition = action.definition();
    validate_request(definition, &request)?;

    match queue {
        Some(queue) if definition.execute_in_own_process && forking_enabled => {
            Ok(execute_in_queue(action.name(), request, queue).await)
        }
        _ => execute_direct(action, &request).await,
    }
}

/// Run an already-validated request in this process.
///
/// Destination failures become failed responses; other errors propagate.
pub async fn execute_direct(
    action: &dyn DynAction,
    request: &ActionRequest,
) -> Result<ActionResponse, ActionError> {
    match action.execute(request).await {
        Err(ActionError::Destination(message)) => {
            warn!(
                action = action.name(),
                webhook_id = request.webhook_id.as_ref().map(|id| id.as_str()),
                error = %message,
                "destination reported failure"
            );
            Ok(ActionResponse::failure(message))
        }
        other => other,
    }
}

async fn execute_in_queue(
    action_id: &str,
    request: ActionRequest,
    queue: &dyn ExecutionQueue,
) -> ActionResponse {
    let webhook_id = request.webhook_id.clone();
    let job = WorkerJob::new(action_id, request);
    let line = match serde_json::to_string(&job) {
        Ok(line) => line,
        Err(e) => return ActionResponse::failure(format!("failed to serialize job: {e}")),
    };

    info!(
        action = action_id,
        webhook_id = webhook_id.as_ref().map(|id| id.as_str()),
        "executing action in own process"
    );
    let result = queue
        .run(line)
        .await
        .and_then(|value| {
            serde_json::from_value::<ActionResponse>(value).map_err(|e| {
                ActionError::Subprocess(format!("worker sent an invalid response: {e}"))
            })
        });

    match result {
        Ok(response) => response,
        Err(e) => {
            warn!(
                action = action_id,
                webhook_id = webhook_id.as_ref().map(|id| id.as_str()),
                error = %e,
                "isolated execution failed"
            );
            ActionResponse::failure(e.to_string())
        }
    }
}

/// Validate `request` and build the action's form.
///
/// Missing parameters and destination failures are rendered as an error
/// form so the caller always has something to display.
pub async fn validate_and_fetch_form(
    action: &dyn DynAction,
    request: &ActionRequest,
) -> Result<ActionForm, ActionError> {
    if !action.has_form() {
        return Err(ActionError::NoForm);
    }
    if let Err(e) = check_required_params(action.definition(), request) {
        return Ok(ActionForm::from_error(e.to_string()));
    }
    match action.form(request).await {
        Err(ActionError::Destination(message)) => Ok(ActionForm::from_error(message)),
        other => other,
    }
}
