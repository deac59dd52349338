use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use tower::ServiceExt;

use actionhub_action::{
    Action, ActionDefinition, ActionError, ActionParameter, ActionRegistry, BaseUrlRoutes,
    DebugAction, ExecutionQueue, RegistryConfig,
};
use actionhub_core::{ActionForm, ActionRequest, ActionResponse, ActionType, FormField};
use actionhub_crypto::SecretString;
use actionhub_server::api::{self, AppState};
use actionhub_server::auth::ApiKeyAuthenticator;

// -- Mock actions ---------------------------------------------------------

/// Posts to a chat room. Requires `room`, supports queries, has a form.
struct ChatAction {
    definition: ActionDefinition,
}

impl ChatAction {
    fn new() -> Self {
        Self {
            definition: ActionDefinition::new(
                "chat",
                "Chat",
                "Post to a chat room",
                vec![ActionType::Query],
            )
            .with_param(ActionParameter::new("room", "Room").required()),
        }
    }
}

impl Action for ChatAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn execute(&self, request: &ActionRequest) -> Result<ActionResponse, ActionError> {
        match request.form_params.get("message").map(String::as_str) {
            Some("fail") => Err(ActionError::Destination("room is archived".into())),
            Some("crash") => Err(ActionError::Configuration("vendor client missing".into())),
            _ => Ok(ActionResponse::success(format!(
                "posted to {}",
                request.params["room"]
            ))),
        }
    }

    fn has_form(&self) -> bool {
        true
    }

    async fn form(&self, _request: &ActionRequest) -> Result<ActionForm, ActionError> {
        Ok(ActionForm::new(vec![
            FormField::new("message").label("Message").required(true),
        ]))
    }
}

/// A form-only action.
struct PickerAction {
    definition: ActionDefinition,
}

impl Action for PickerAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn execute(&self, _request: &ActionRequest) -> Result<ActionResponse, ActionError> {
        Err(ActionError::NoExecute)
    }

    fn has_execute(&self) -> bool {
        false
    }

    fn has_form(&self) -> bool {
        true
    }

    async fn form(&self, _request: &ActionRequest) -> Result<ActionForm, ActionError> {
        Ok(ActionForm::new(vec![FormField::new("pick")]))
    }
}

/// Execute only, no form.
struct PingAction {
    definition: ActionDefinition,
}

impl Action for PingAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn execute(&self, _request: &ActionRequest) -> Result<ActionResponse, ActionError> {
        Ok(ActionResponse::success("pong"))
    }
}

// -- Mock queue -----------------------------------------------------------

#[derive(Default)]
struct RecordingQueue {
    jobs: Mutex<Vec<serde_json::Value>>,
    fail: bool,
}

#[async_trait]
impl ExecutionQueue for RecordingQueue {
    async fn run(&self, job: String) -> Result<serde_json::Value, ActionError> {
        let job: serde_json::Value = serde_json::from_str(&job).unwrap();
        self.jobs.lock().unwrap().push(job);
        if self.fail {
            return Err(ActionError::Subprocess(
                "worker exited without a response (code: Some(1), signal: None)".into(),
            ));
        }
        Ok(serde_json::json!({"success": true, "message": "ran in worker"}))
    }
}

// -- Helpers --------------------------------------------------------------

const SECRET: &str = "test-secret";
const BASE_URL: &str = "https://hub.example.com";

fn authenticator() -> ApiKeyAuthenticator {
    ApiKeyAuthenticator::new(Some(SecretString::new(SECRET.to_owned())))
}

fn auth_header() -> String {
    let token = authenticator().from_nonce("test-nonce").unwrap();
    format!("Token token=\"{token}\"")
}

fn registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new(RegistryConfig::default());
    registry.register(Arc::new(ChatAction::new()));
    registry.register(Arc::new(PickerAction {
        definition: ActionDefinition::new("picker", "Picker", "Pick", vec![ActionType::Query]),
    }));
    registry.register(Arc::new(PingAction {
        definition: ActionDefinition::new("ping", "Ping", "Ping", vec![ActionType::Cell]),
    }));
    registry.register(Arc::new(DebugAction::forked()));
    registry
}

fn build_app_with(queue: Option<Arc<RecordingQueue>>, body_limit_bytes: usize) -> axum::Router {
    let state = AppState {
        registry: Arc::new(registry()),
        queue: queue.map(|q| q as Arc<dyn ExecutionQueue>),
        forking_enabled: true,
        routes: Arc::new(BaseUrlRoutes::new(BASE_URL)),
        label: "Test Hub".to_owned(),
        authenticator: Arc::new(authenticator()),
        body_limit_bytes,
    };
    api::router(state)
}

fn build_app() -> axum::Router {
    build_app_with(None, 1024 * 1024)
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(http::header::AUTHORIZATION, auth_header())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn chat_request(message: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "query",
        "data": {"room": "general"},
        "form_params": {"message": message},
    })
}

// -- Status & auth --------------------------------------------------------

#[tokio::test]
async fn status_is_public() {
    let request = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn missing_authorization_is_403() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json,
        serde_json::json!({"success": false, "error": "Invalid 'Authorization' header."})
    );
}

#[tokio::test]
async fn forged_token_is_403() {
    let forged = ApiKeyAuthenticator::new(Some(SecretString::new("other".to_owned())))
        .from_nonce("test-nonce")
        .unwrap();
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/actions/chat/execute")
        .header(http::header::AUTHORIZATION, format!("Token token=\"{forged}\""))
        .body(Body::from(chat_request("hi").to_string()))
        .unwrap();
    let (status, _) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Listing --------------------------------------------------------------

#[tokio::test]
async fn list_returns_label_and_integrations() {
    let (status, json) = send(build_app(), post("/", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "Test Hub");

    let integrations = json["integrations"].as_array().unwrap();
    let names: Vec<&str> = integrations
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["chat", "picker", "ping", "debug_forked"]);

    let chat = &integrations[0];
    assert_eq!(chat["url"], format!("{BASE_URL}/actions/chat/execute"));
    assert_eq!(chat["form_url"], format!("{BASE_URL}/actions/chat/form"));
    assert_eq!(chat["supported_action_types"], serde_json::json!(["query"]));
    assert!(integrations[1]["url"].is_null());
    assert!(integrations[2]["form_url"].is_null());
}

#[tokio::test]
async fn old_callers_see_no_actions() {
    let mut request = post("/", serde_json::json!({}));
    request.headers_mut().insert(
        http::header::USER_AGENT,
        "LookerOutgoingWebhook/5.0.0".parse().unwrap(),
    );
    let (status, json) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["integrations"], serde_json::json!([]));
}

#[tokio::test]
async fn describe_returns_single_entry() {
    let (status, json) = send(build_app(), post("/actions/chat", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "chat");
    assert_eq!(json["params"][0]["name"], "room");
}

#[tokio::test]
async fn action_routes_answer_get() {
    let request = Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, auth_header())
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "Test Hub");

    let request = Request::builder()
        .method(http::Method::GET)
        .uri("/actions/chat")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_action_is_404() {
    let (status, json) =
        send(build_app(), post("/actions/missing/execute", chat_request("hi"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json,
        serde_json::json!({"success": false, "error": "No action found."})
    );
}

// -- Execute --------------------------------------------------------------

#[tokio::test]
async fn execute_returns_response_json() {
    let (status, json) = send(build_app(), post("/actions/chat/execute", chat_request("hi"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({
            "success": true,
            "message": "posted to general",
            "refresh_query": false,
            "validation_errors": {},
        })
    );
}

#[tokio::test]
async fn unsupported_type_lists_supported_types() {
    let body = serde_json::json!({"type": "dashboard", "data": {"room": "general"}});
    let (status, json) = send(build_app(), post("/actions/chat/execute", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(
        json["error"],
        "This action does not support requests of type \"dashboard\". Valid types for this action are: query."
    );
}

#[tokio::test]
async fn unknown_type_lists_supported_types() {
    let body = serde_json::json!({"type": "spreadsheet", "data": {"room": "general"}});
    let (status, json) = send(build_app(), post("/actions/chat/execute", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["error"],
        "This action does not support requests of type \"spreadsheet\". Valid types for this action are: query."
    );
}

#[tokio::test]
async fn missing_required_param_names_it() {
    let body = serde_json::json!({"type": "query", "data": {}});
    let (status, json) = send(build_app(), post("/actions/chat/execute", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Required parameter \"room\" not provided.");
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/actions/chat/execute")
        .header(http::header::AUTHORIZATION, auth_header())
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("Request body must be valid JSON.")
    );
}

#[tokio::test]
async fn destination_failure_is_failed_response() {
    let (status, json) =
        send(build_app(), post("/actions/chat/execute", chat_request("fail"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "room is archived");
}

#[tokio::test]
async fn internal_error_is_masked() {
    let (status, json) =
        send(build_app(), post("/actions/chat/execute", chat_request("crash"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        serde_json::json!({"success": false, "error": "Internal server error."})
    );
}

#[tokio::test]
async fn form_only_action_cannot_execute() {
    let body = serde_json::json!({"type": "query"});
    let (status, json) = send(build_app(), post("/actions/picker/execute", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No action defined for action.");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = build_app_with(None, 64);
    let body = serde_json::json!({"type": "query", "data": {"room": "x".repeat(256)}});
    let response = app
        .oneshot(post("/actions/chat/execute", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// -- Isolated execution ---------------------------------------------------

#[tokio::test]
async fn isolated_action_goes_through_queue() {
    let queue = Arc::new(RecordingQueue::default());
    let app = build_app_with(Some(Arc::clone(&queue)), 1024 * 1024);

    let mut request = post(
        "/actions/debug_forked/execute",
        serde_json::json!({"type": "cell", "form_params": {"sleep": "0"}}),
    );
    request
        .headers_mut()
        .insert("x-looker-webhook-id", "hook-9".parse().unwrap());
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "ran in worker");

    let jobs = queue.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["action_id"], "debug_forked");
    assert_eq!(jobs[0]["request"]["form_params"]["sleep"], "0");
}

#[tokio::test]
async fn queue_failure_is_failed_response() {
    let queue = Arc::new(RecordingQueue {
        fail: true,
        ..RecordingQueue::default()
    });
    let app = build_app_with(Some(queue), 1024 * 1024);
    let (status, json) = send(
        app,
        post(
            "/actions/debug_forked/execute",
            serde_json::json!({"type": "cell", "form_params": {"sleep": "0"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("exited without a response")
    );
}

#[tokio::test]
async fn without_queue_isolated_action_runs_in_process() {
    let (status, json) = send(
        build_app(),
        post(
            "/actions/debug_forked/execute",
            serde_json::json!({"type": "cell", "form_params": {"sleep": "0"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["message"].as_str().unwrap().contains("sleeping for 0 ms"));
}

// -- Forms ----------------------------------------------------------------

#[tokio::test]
async fn form_returns_field_array() {
    let body = serde_json::json!({"type": "query", "data": {"room": "general"}});
    let (status, json) = send(build_app(), post("/actions/chat/form", body)).await;
    assert_eq!(status, StatusCode::OK);
    let fields = json.as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["name"], "message");
}

#[tokio::test]
async fn form_ignores_unknown_type() {
    let body = serde_json::json!({"type": "spreadsheet", "data": {"room": "general"}});
    let (status, json) = send(build_app(), post("/actions/chat/form", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["name"], "message");
}

#[tokio::test]
async fn form_missing_param_renders_error_form() {
    let body = serde_json::json!({"type": "query"});
    let (status, json) = send(build_app(), post("/actions/chat/form", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({"error": "Required parameter \"room\" not provided."})
    );
}

#[tokio::test]
async fn action_without_form_is_404() {
    let body = serde_json::json!({"type": "cell"});
    let (status, json) = send(build_app(), post("/actions/ping/form", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No form defined for action.");
}
