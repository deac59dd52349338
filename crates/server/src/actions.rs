use std::sync::Arc;

use actionhub_action::{ActionRegistry, DebugAction, RegistryConfig};

/// Build the registry of actions shipped with this binary.
///
/// The hub and every worker call this with the same settings, so a job's
/// `action_id` resolves to the same action on both sides of the process
/// boundary.
pub fn builtin_registry(config: RegistryConfig, debug_endpoint: bool) -> ActionRegistry {
    let mut registry = ActionRegistry::new(config);
    if debug_endpoint {
        registry.register(Arc::new(DebugAction::new()));
        registry.register(Arc::new(DebugAction::forked()));
    }
    tracing::debug!(actions = ?registry.names(), "action registry built");
    registry
}
