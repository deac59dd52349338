use std::time::Duration;

use actionhub_core::{ActionForm, ActionRequest, ActionResponse, ActionType, FormField};
use tracing::info;

use crate::action::Action;
use crate::definition::ActionDefinition;
use crate::error::ActionError;

const DEFAULT_SLEEP_MS: u64 = 1000;

/// An action that sleeps and reports what it received, without contacting
/// any destination.
///
/// Useful for exercising the hub end to end. The forked variant runs in an
/// isolated worker process.
pub struct DebugAction {
    definition: ActionDefinition,
}

impl DebugAction {
    /// The in-process variant, named `debug`.
    pub fn new() -> Self {
        Self::named("debug", "Debug Action")
    }

    /// The isolated variant, named `debug_forked`.
    pub fn forked() -> Self {
        let mut action = Self::named("debug_forked", "Debug Action (Own Process)");
        action.definition.execute_in_own_process = true;
        action
    }

    fn named(name: &str, label: &str) -> Self {
        Self {
            definition: ActionDefinition::new(
                name,
                label,
                "Sleeps for a configurable time and reports what it received.",
                vec![ActionType::Cell, ActionType::Query, ActionType::Dashboard],
            ),
        }
    }
}

impl Default for DebugAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for DebugAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn execute(&self, request: &ActionRequest) -> Result<ActionResponse, ActionError> {
        let sleep_ms = match request.form_params.get("sleep").map(|s| s.trim()) {
            None | Some("") => DEFAULT_SLEEP_MS,
            Some(raw) => raw.parse().map_err(|_| {
                ActionError::Destination(format!("Invalid sleep value {raw:?}."))
            })?,
        };
        let download_url = request
            .form_params
            .get("simulated_download_url")
            .filter(|url| !url.is_empty())
            .map(String::as_str)
            .or_else(|| request.download_url());

        info!(
            action = %self.definition.name,
            pid = std::process::id(),
            sleep_ms,
            "debug action sleeping"
        );
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;

        let bytes = request
            .attachment
            .as_ref()
            .and_then(|a| a.data_buffer.as_ref())
            .map_or(0, Vec::len);
        let mut message =
            format!("Completed debug action successfully by sleeping for {sleep_ms} ms");
        if let Some(url) = download_url {
            message.push_str(&format!(" with download url {url}"));
        }
        message.push_str(&format!(" and {bytes} bytes of attachment data."));
        Ok(ActionResponse::success(message))
    }

    fn has_form(&self) -> bool {
        true
    }

    async fn form(&self, _request: &ActionRequest) -> Result<ActionForm, ActionError> {
        Ok(ActionForm::new(vec![
            FormField::new("sleep")
                .label("Sleep")
                .description("Milliseconds to sleep before responding."),
            FormField::new("simulated_download_url")
                .label("Simulated download URL")
                .description("Reported as the download URL instead of the request's own."),
        ]))
    }
}
