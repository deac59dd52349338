pub mod action;
pub mod debug;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod oauth;
pub mod queue;
pub mod registry;
pub mod stream;

pub use action::{Action, DynAction};
pub use debug::DebugAction;
pub use definition::{
    ActionDefinition, ActionParameter, BaseUrlRoutes, RequiredField, RouteBuilder,
};
pub use dispatch::{execute_direct, validate_and_execute, validate_and_fetch_form, validate_request};
pub use error::{ActionError, StreamError, ValidationError};
pub use oauth::{OAuthState, extract_tokens_from_state_json, maybe_encrypt_tokens};
pub use queue::{ExecutionQueue, WorkerJob};
pub use registry::{ActionRegistry, RegistryConfig};
pub use stream::{
    DataReader, JsonDetailEvent, Row, open_stream, read_json_detail, read_json_rows, stream_json,
    stream_json_detail,
};
