use serde::{Deserialize, Serialize};

use crate::types::WebhookId;

/// A per-field validation message returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Opaque state the caller stores and sends back on the next round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub data: Option<String>,
    /// Seconds after which the caller should refresh the state.
    pub refresh_time: Option<u64>,
}

/// Result of executing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionResponse {
    pub success: bool,
    pub message: Option<String>,
    pub refresh_query: bool,
    pub validation_errors: Vec<FieldError>,
    pub state: Option<ActionState>,
    pub webhook_id: Option<WebhookId>,
}

impl Default for ActionResponse {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            refresh_query: false,
            validation_errors: Vec::new(),
            state: None,
            webhook_id: None,
        }
    }
}

impl ActionResponse {
    /// A successful response carrying `message`.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A failed response carrying `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Add a validation error for `field`.
    #[must_use]
    pub fn with_validation_error(
        mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.validation_errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    /// Wire JSON. `success`, `message`, `refresh_query` and
    /// `validation_errors` are always present.
    pub fn as_json(&self) -> serde_json::Value {
        let errors: serde_json::Map<String, serde_json::Value> = self
            .validation_errors
            .iter()
            .map(|e| (e.field.clone(), serde_json::Value::String(e.message.clone())))
            .collect();

        let mut json = serde_json::json!({
            "success": self.success,
            "message": self.message,
            "refresh_query": self.refresh_query,
            "validation_errors": errors,
        });
        if let Some(state) = &self.state {
            json["state"] = serde_json::json!(state);
        }
        if let Some(webhook_id) = &self.webhook_id {
            json["webhookId"] = serde_json::json!(webhook_id);
        }
        json
    }
}
