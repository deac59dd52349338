pub mod actions;
pub mod health;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use actionhub_action::{ActionRegistry, BaseUrlRoutes, ExecutionQueue};

use crate::auth::{ApiKeyAuthenticator, AuthLayer};

/// Header carrying the calling instance's identifier.
pub const INSTANCE_HEADER: &str = "x-looker-instance";
/// Header carrying the webhook identifier of the delivery.
pub const WEBHOOK_HEADER: &str = "x-looker-webhook-id";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Installed actions.
    pub registry: Arc<ActionRegistry>,
    /// Queue for actions that run in their own process (None disables it).
    pub queue: Option<Arc<dyn ExecutionQueue>>,
    /// Whether flagged actions are sent to `queue`.
    pub forking_enabled: bool,
    /// Builds the execute and form URLs in listings.
    pub routes: Arc<BaseUrlRoutes>,
    /// Name of this hub in listings.
    pub label: String,
    /// Checks the `Authorization` header on every action route.
    pub authenticator: Arc<ApiKeyAuthenticator>,
    /// Largest accepted request body.
    pub body_limit_bytes: usize,
}

/// Correlation headers sent by the caller. Used for logging only.
#[derive(Debug, Default, Clone)]
pub struct CallerHeaders {
    pub instance_id: Option<String>,
    pub webhook_id: Option<String>,
    pub user_agent: Option<String>,
}

impl CallerHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        Self {
            instance_id: get(INSTANCE_HEADER),
            webhook_id: get(WEBHOOK_HEADER),
            user_agent: get("user-agent"),
        }
    }
}

/// Build the Axum router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/status", get(health::status));

    // Callers use POST, but the action routes answer GET as well.
    let protected = Router::new()
        .route("/", post(actions::list_actions).get(actions::list_actions))
        .route(
            "/actions/{action_id}",
            post(actions::describe_action).get(actions::describe_action),
        )
        .route(
            "/actions/{action_id}/execute",
            post(actions::execute_action).get(actions::execute_action),
        )
        .route(
            "/actions/{action_id}/form",
            post(actions::action_form).get(actions::action_form),
        )
        .layer(AuthLayer::new(Arc::clone(&state.authenticator)));

    let body_limit = state.body_limit_bytes;
    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
