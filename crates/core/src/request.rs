use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::RequestError;
use crate::text::{sanitize_filename, truncate_string};
use crate::types::{ActionType, InstanceId, WebhookId};

/// String-to-string settings map (`data` and `form_params` on the wire).
pub type ParamMap = BTreeMap<String, String>;

const USER_AGENT_PREFIX: &str = "LookerOutgoingWebhook/";

/// Metadata present when the request was produced by a recurring schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPlan {
    pub scheduled_plan_id: Option<i64>,
    pub title: Option<String>,
    /// `"Look"` or `"Dashboard"`.
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
    /// URL of the content item in the calling system.
    pub url: Option<String>,
    pub query_id: Option<i64>,
    pub query: Option<serde_json::Value>,
    pub filters_differ_from_look: Option<bool>,
    /// Set when the data must be streamed from a URL instead of pushed inline.
    pub download_url: Option<String>,
}

/// One inbound action invocation.
///
/// Built fresh per HTTP call with [`ActionRequest::from_json`]. The derived
/// serde form is the self-contained job description sent to worker processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The `type` the caller sent, kept verbatim so unknown types can be
    /// rejected against the action's supported list.
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub form_params: ParamMap,
    #[serde(default)]
    pub params: ParamMap,
    pub scheduled_plan: Option<ScheduledPlan>,
    pub instance_id: Option<InstanceId>,
    pub webhook_id: Option<WebhookId>,
    pub caller_version: Option<Version>,
    /// Name of the action this request was routed to, set when it is handed
    /// to a worker process.
    pub action_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(rename = "type")]
    action_type: Option<String>,
    attachment: Option<WireAttachment>,
    scheduled_plan: Option<ScheduledPlan>,
    data: Option<serde_json::Map<String, serde_json::Value>>,
    form_params: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct WireAttachment {
    mimetype: Option<String>,
    extension: Option<String>,
    data: Option<String>,
}

impl ActionRequest {
    /// Normalize a wire payload into a request.
    ///
    /// Fails with [`RequestError::InvalidBody`] when `json` is null or not a
    /// payload object, and propagates attachment decoding failures.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, RequestError> {
        if json.is_null() {
            return Err(RequestError::InvalidBody("Body was empty.".into()));
        }
        let wire = WirePayload::deserialize(json)
            .map_err(|e| RequestError::InvalidBody(e.to_string()))?;

        let attachment = wire
            .attachment
            .map(|a| Attachment::decode(a.mimetype, a.extension, a.data.as_deref()))
            .transpose()?;

        Ok(Self {
            action_type: wire.action_type,
            attachment,
            form_params: wire.form_params.map(param_map).unwrap_or_default(),
            params: wire.data.map(param_map).unwrap_or_default(),
            scheduled_plan: wire.scheduled_plan,
            ..Self::default()
        })
    }

    /// Attach the correlation headers and the caller version parsed from the
    /// user agent.
    #[must_use]
    pub fn with_headers(
        mut self,
        instance_id: Option<&str>,
        webhook_id: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        self.instance_id = instance_id.map(InstanceId::from);
        self.webhook_id = webhook_id.map(WebhookId::from);
        self.caller_version = user_agent.and_then(parse_caller_version);
        self
    }

    /// The requested type, if it is one this hub knows.
    pub fn known_action_type(&self) -> Option<ActionType> {
        self.action_type.as_deref()?.parse().ok()
    }

    /// Download URL of the scheduled plan, if the caller asked for streaming.
    pub fn download_url(&self) -> Option<&str> {
        self.scheduled_plan
            .as_ref()
            .and_then(|p| p.download_url.as_deref())
    }

    /// True when the request has neither a download URL nor decoded data.
    pub fn empty(&self) -> bool {
        let no_url = self.download_url().is_none();
        let no_buffer = self
            .attachment
            .as_ref()
            .is_none_or(|a| a.data_buffer.is_none());
        no_url && no_buffer
    }

    /// A filesystem-safe name for the attachment, or `None` without one.
    ///
    /// Uses the scheduled plan title when present, otherwise a
    /// `looker_file_<millis>` placeholder.
    pub fn suggested_filename(&self) -> Option<String> {
        let attachment = self.attachment.as_ref()?;
        let base = self
            .scheduled_plan
            .as_ref()
            .and_then(|p| p.title.clone())
            .unwrap_or_else(|| format!("looker_file_{}", chrono::Utc::now().timestamp_millis()));
        let name = match attachment.file_extension.as_deref() {
            Some(ext) => format!("{base}.{ext}"),
            None => base,
        };
        Some(sanitize_filename(&name))
    }

    /// A short message for chat-style destinations: an optional title and
    /// URL preamble followed by at most `max_lines` lines of the body, cut
    /// to `max_characters` without splitting a line.
    pub fn suggested_truncated_message(
        &self,
        max_lines: usize,
        max_characters: usize,
    ) -> Option<String> {
        let body = self.attachment.as_ref()?.data_text()?;

        let mut preamble = String::new();
        if let Some(plan) = &self.scheduled_plan {
            if let Some(title) = &plan.title {
                preamble.push_str(title);
                preamble.push_str(":\n");
            }
            if let Some(url) = &plan.url {
                preamble.push_str(url);
                preamble.push('\n');
            }
        }

        let mut lines: Vec<&str> = body.split('\n').take(max_lines).collect();
        if lines.len() == max_lines {
            lines.push("");
        }
        let message = format!("{preamble}{}", lines.join("\n"));
        Some(truncate_string(&message, max_characters))
    }
}

/// Parse the caller version out of a `LookerOutgoingWebhook/<version>` user
/// agent. Versions that are not valid semver are ignored.
pub fn parse_caller_version(user_agent: &str) -> Option<Version> {
    let (_, rest) = user_agent.split_once(USER_AGENT_PREFIX)?;
    let raw = rest.split_whitespace().next()?;
    Version::parse(raw.trim_start_matches(['v', '='])).ok()
}

fn param_map(map: serde_json::Map<String, serde_json::Value>) -> ParamMap {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect()
}
