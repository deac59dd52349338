use actionhub_core::{ActionType, RequestError};
use actionhub_crypto::CryptoError;
use thiserror::Error;

/// A request that is structurally invalid for the action it was sent to.
///
/// Raised before any destination code runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "Action did not specify a \"type\". Valid types for this action are: {}.",
        join_types(.supported)
    )]
    MissingType { supported: Vec<ActionType> },

    #[error(
        "This action does not support requests of type \"{requested}\". Valid types for this action are: {}.",
        join_types(.supported)
    )]
    UnsupportedType {
        requested: String,
        supported: Vec<ActionType>,
    },

    #[error("Required parameter \"{name}\" not provided.")]
    MissingRequiredParam { name: String },

    #[error(
        "A streaming action was sent incompatible data. The action must have a download url or an attachment."
    )]
    StreamingMismatch,
}

fn join_types(types: &[ActionType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures while reading request data as a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(
        "Request has neither a download URL nor an attachment to stream. Check that the action sets uses_streaming."
    )]
    NoData,

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("invalid JSON in streamed data: {0}")]
    Json(#[from] serde_json::Error),

    /// The blocking parser task panicked or was cancelled.
    #[error("stream parser failed: {0}")]
    Parser(String),
}

/// Errors that can occur while resolving or running an action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No action with this name is exposed to the caller.
    #[error("No action found.")]
    NotFound(String),

    #[error("No action defined for action.")]
    NoExecute,

    #[error("No form defined for action.")]
    NoForm,

    /// A failure reported by the destination itself.
    #[error("{0}")]
    Destination(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The isolated worker process failed.
    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl ActionError {
    /// Whether the message is meant for the caller verbatim.
    ///
    /// Other errors are reported as a generic internal error.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::NoExecute
                | Self::NoForm
                | Self::Destination(_)
                | Self::Request(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_lists_supported_types() {
        let err = ValidationError::UnsupportedType {
            requested: "dashboard".into(),
            supported: vec![ActionType::Query],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"dashboard\""), "{msg}");
        assert!(msg.ends_with("Valid types for this action are: query."), "{msg}");
    }

    #[test]
    fn missing_type_lists_all_supported() {
        let err = ValidationError::MissingType {
            supported: vec![ActionType::Cell, ActionType::Query],
        };
        assert!(err.to_string().ends_with("are: cell, query."));
    }

    #[test]
    fn missing_param_names_param() {
        let err = ValidationError::MissingRequiredParam {
            name: "room".into(),
        };
        assert_eq!(err.to_string(), "Required parameter \"room\" not provided.");
    }

    #[test]
    fn user_facing_split() {
        assert!(ActionError::NotFound("x".into()).is_user_facing());
        assert!(ActionError::from(ValidationError::StreamingMismatch).is_user_facing());
        assert!(ActionError::Destination("vendor said no".into()).is_user_facing());
        assert!(!ActionError::Configuration("no key".into()).is_user_facing());
        assert!(!ActionError::Subprocess("crashed".into()).is_user_facing());
        assert!(!ActionError::Crypto(CryptoError::NotConfigured).is_user_facing());
        assert!(!ActionError::from(StreamError::NoData).is_user_facing());
    }

    #[test]
    fn not_found_message_is_generic() {
        assert_eq!(
            ActionError::NotFound("secret_action".into()).to_string(),
            "No action found."
        );
    }
}
