use actionhub_core::{
    ActionDownloadSetting, ActionFormat, ActionFormatting, ActionType,
    ActionVisualizationFormatting,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Characters left unescaped in URL path segments, matching JavaScript's
/// `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A setting the hub administrator configures for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    pub label: String,
    pub required: bool,
    /// Sensitive values are masked by the calling system.
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: false,
            sensitive: false,
            description: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A field tag constraint the calling system uses to decide where to offer
/// the action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_tags: Option<Vec<String>>,
}

/// Builds the absolute URLs advertised in action listings.
pub trait RouteBuilder: Send + Sync {
    fn action_url(&self, action_name: &str) -> String;
    fn form_url(&self, action_name: &str) -> String;
}

/// Routes under a fixed public base URL.
#[derive(Debug, Clone)]
pub struct BaseUrlRoutes {
    base_url: String,
}

impl BaseUrlRoutes {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn abs_url(&self, action_name: &str, suffix: &str) -> String {
        format!(
            "{}/actions/{}/{suffix}",
            self.base_url,
            utf8_percent_encode(action_name, COMPONENT)
        )
    }
}

impl RouteBuilder for BaseUrlRoutes {
    fn action_url(&self, action_name: &str) -> String {
        self.abs_url(action_name, "execute")
    }

    fn form_url(&self, action_name: &str) -> String {
        self.abs_url(action_name, "form")
    }
}

/// Static description of an action: identity, accepted input, parameters,
/// and execution hints.
#[derive(Debug, Clone)]
pub struct ActionDefinition {
    /// Stable unique key.
    pub name: String,
    pub label: String,
    pub description: String,
    pub icon_data_uri: Option<String>,
    pub supported_action_types: Vec<ActionType>,
    pub supported_formats: Option<Vec<ActionFormat>>,
    pub supported_formattings: Option<Vec<ActionFormatting>>,
    pub supported_visualization_formattings: Option<Vec<ActionVisualizationFormatting>>,
    pub required_fields: Vec<RequiredField>,
    pub params: Vec<ActionParameter>,
    /// Oldest caller version the action is offered to.
    pub minimum_supported_version: Version,
    /// Consumes a download URL instead of an inline attachment.
    pub uses_streaming: bool,
    /// Must run in an isolated worker process.
    pub execute_in_own_process: bool,
    pub uses_oauth: bool,
}

impl ActionDefinition {
    /// Earliest caller version that supports the action API.
    pub const DEFAULT_MINIMUM_VERSION: Version = Version::new(5, 5, 0);

    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        supported_action_types: Vec<ActionType>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: description.into(),
            icon_data_uri: None,
            supported_action_types,
            supported_formats: None,
            supported_formattings: None,
            supported_visualization_formattings: None,
            required_fields: Vec::new(),
            params: Vec::new(),
            minimum_supported_version: Self::DEFAULT_MINIMUM_VERSION,
            uses_streaming: false,
            execute_in_own_process: false,
            uses_oauth: false,
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: ActionParameter) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: Vec<ActionFormat>) -> Self {
        self.supported_formats = Some(formats);
        self
    }

    #[must_use]
    pub fn with_required_field(mut self, field: RequiredField) -> Self {
        self.required_fields.push(field);
        self
    }

    #[must_use]
    pub fn with_minimum_version(mut self, version: Version) -> Self {
        self.minimum_supported_version = version;
        self
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.uses_streaming = true;
        self
    }

    #[must_use]
    pub fn in_own_process(mut self) -> Self {
        self.execute_in_own_process = true;
        self
    }

    #[must_use]
    pub fn oauth(mut self) -> Self {
        self.uses_oauth = true;
        self
    }

    /// Required parameters, in declaration order.
    pub fn required_params(&self) -> impl Iterator<Item = &ActionParameter> {
        self.params.iter().filter(|p| p.required)
    }

    /// Listing entry for this action.
    pub fn as_json(
        &self,
        routes: &dyn RouteBuilder,
        has_execute: bool,
        has_form: bool,
    ) -> serde_json::Value {
        let download_setting = if self.uses_streaming {
            ActionDownloadSetting::Url
        } else {
            ActionDownloadSetting::Push
        };
        serde_json::json!({
            "name": self.name,
            "label": self.label,
            "description": self.description,
            "params": self.params,
            "required_fields": self.required_fields,
            "supported_action_types": self.supported_action_types,
            "supported_formats": self.supported_formats,
            "supported_formattings": self.supported_formattings,
            "supported_visualization_formattings": self.supported_visualization_formattings,
            "supported_download_settings": [download_setting],
            "uses_oauth": self.uses_oauth,
            "icon_data_uri": self.icon_data_uri,
            "url": has_execute.then(|| routes.action_url(&self.name)),
            "form_url": has_form.then(|| routes.form_url(&self.name)),
        })
    }
}
