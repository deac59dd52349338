use thiserror::Error;

/// Errors raised while normalizing an inbound payload into an
/// [`ActionRequest`](crate::ActionRequest).
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body was missing, null, or did not have the payload shape.
    #[error("Request body must be valid JSON. {0}")]
    InvalidBody(String),

    /// The attachment declared an encoding its data could not be decoded with.
    #[error("Attachment data could not be decoded: {0}")]
    InvalidAttachment(String),

    /// The attachment declared `application/json` but its data did not parse.
    #[error("Attachment declared application/json but is not valid JSON: {0}")]
    AttachmentJson(#[source] serde_json::Error),
}
