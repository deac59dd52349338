use serde::{Deserialize, Serialize};

use crate::response::ActionState;

/// Input widget rendered for a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    String,
    Textarea,
    Select,
    OauthLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOption {
    pub name: String,
    pub label: String,
}

/// One field of a configuration form shown to the end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FormFieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FormOption>,
    /// Re-fetch the form when this field changes.
    #[serde(default)]
    pub interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_url: Option<String>,
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            field_type: None,
            default: None,
            required: false,
            options: Vec::new(),
            interactive: false,
            oauth_url: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field_type(mut self, field_type: FormFieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn option(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(FormOption {
            name: name.into(),
            label: label.into(),
        });
        self
    }
}

/// A form description, or an error to show in place of one.
///
/// Forms are rendered to end users, so failures are carried as
/// [`ActionForm::error`] rather than surfaced as request errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionForm {
    pub fields: Vec<FormField>,
    pub state: Option<ActionState>,
    pub error: Option<String>,
}

impl ActionForm {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// A form whose only content is an error message.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn as_json(&self) -> serde_json::Value {
        if let Some(error) = &self.error {
            return serde_json::json!({ "error": error });
        }
        match &self.state {
            Some(state) => serde_json::json!({ "fields": self.fields, "state": state }),
            None => serde_json::json!(self.fields),
        }
    }
}
