use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use serde_json::Value;
use tracing::{debug, info};

use actionhub_action::{validate_and_execute, validate_and_fetch_form};
use actionhub_core::{ActionRequest, RequestError, parse_caller_version};

use super::{AppState, CallerHeaders};
use crate::error::ServerError;

fn log_start(uri: &Uri, caller: &CallerHeaders) {
    info!(
        url = %uri,
        instance_id = caller.instance_id.as_deref(),
        webhook_id = caller.webhook_id.as_deref(),
        "Starting request."
    );
}

/// Normalize the request body into an [`ActionRequest`] carrying the caller
/// headers. An empty body is treated as a missing payload.
fn parse_request(body: &[u8], caller: &CallerHeaders) -> Result<ActionRequest, ServerError> {
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| RequestError::InvalidBody(e.to_string()))?
    };
    Ok(ActionRequest::from_json(&json)?.with_headers(
        caller.instance_id.as_deref(),
        caller.webhook_id.as_deref(),
        caller.user_agent.as_deref(),
    ))
}

/// `/` -- the hub label and every action visible to the caller.
pub async fn list_actions(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Json<Value> {
    let caller = CallerHeaders::from_headers(&headers);
    log_start(&uri, &caller);

    let version = caller.user_agent.as_deref().and_then(parse_caller_version);
    let integrations: Vec<Value> = state
        .registry
        .all(version.as_ref())
        .iter()
        .map(|action| {
            action
                .definition()
                .as_json(state.routes.as_ref(), action.has_execute(), action.has_form())
        })
        .collect();

    let response = serde_json::json!({
        "integrations": integrations,
        "label": state.label,
    });
    debug!(response = %response, "listing response");
    Json(response)
}

/// `/actions/{action_id}` -- one action's listing entry.
pub async fn describe_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Value>, ServerError> {
    let caller = CallerHeaders::from_headers(&headers);
    log_start(&uri, &caller);

    let version = caller.user_agent.as_deref().and_then(parse_caller_version);
    let action = state.registry.find(&action_id, version.as_ref())?;
    Ok(Json(action.definition().as_json(
        state.routes.as_ref(),
        action.has_execute(),
        action.has_form(),
    )))
}

/// `/actions/{action_id}/execute` -- validate and run the action.
pub async fn execute_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServerError> {
    let caller = CallerHeaders::from_headers(&headers);
    log_start(&uri, &caller);

    let request = parse_request(&body, &caller)?;
    let action = state
        .registry
        .find(&action_id, request.caller_version.as_ref())?;
    let response = validate_and_execute(
        action.as_ref(),
        request,
        state.queue.as_deref(),
        state.forking_enabled,
    )
    .await?;
    Ok(Json(response.as_json()))
}

/// `/actions/{action_id}/form` -- the action's configuration form.
pub async fn action_form(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServerError> {
    let caller = CallerHeaders::from_headers(&headers);
    log_start(&uri, &caller);

    let request = parse_request(&body, &caller)?;
    let action = state
        .registry
        .find(&action_id, request.caller_version.as_ref())?;
    let form = validate_and_fetch_form(action.as_ref(), &request).await?;
    Ok(Json(form.as_json()))
}
