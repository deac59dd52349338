pub mod attachment;
pub mod error;
pub mod form;
pub mod request;
pub mod response;
pub mod text;
pub mod types;

pub use attachment::{Attachment, AttachmentEncoding};
pub use error::RequestError;
pub use form::{ActionForm, FormField, FormFieldType, FormOption};
pub use request::{ActionRequest, ParamMap, ScheduledPlan, parse_caller_version};
pub use response::{ActionResponse, ActionState, FieldError};
pub use text::{sanitize_filename, truncate_string};
pub use types::{
    ActionDownloadSetting, ActionFormat, ActionFormatting, ActionType,
    ActionVisualizationFormatting, InstanceId, WebhookId,
};
