use std::sync::Arc;

use semver::Version;

use crate::action::DynAction;
use crate::error::ActionError;

/// Which registered actions are exposed, and to whom.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// When set, only these action names are exposed.
    pub allow_list: Option<Vec<String>>,
    /// Callers older than this see no actions at all.
    pub minimum_caller_version: Option<Version>,
}

impl RegistryConfig {
    /// Parse a comma-separated allow-list. Blank input means no restriction.
    pub fn parse_allow_list(raw: &str) -> Option<Vec<String>> {
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
        (!names.is_empty()).then_some(names)
    }
}

/// A registry of the actions installed in this process.
///
/// Built once at startup and then shared behind an `Arc`; lookups never take
/// a lock. Registration order is preserved in listings.
pub struct ActionRegistry {
    actions: Vec<Arc<dyn DynAction>>,
    config: RegistryConfig,
}

impl ActionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            actions: Vec::new(),
            config,
        }
    }

    /// Register an action under its definition name, replacing any action
    /// already registered with that name.
    pub fn register(&mut self, action: Arc<dyn DynAction>) {
        match self.actions.iter_mut().find(|a| a.name() == action.name()) {
            Some(slot) => *slot = action,
            None => self.actions.push(action),
        }
    }

    /// Actions visible to a caller running `caller_version`.
    ///
    /// Filters by the allow-list, the hub-wide minimum caller version, and
    /// each action's own minimum version. Without a caller version only the
    /// allow-list applies.
    pub fn all(&self, caller_version: Option<&Version>) -> Vec<Arc<dyn DynAction>> {
        if let (Some(min), Some(caller)) = (&self.config.minimum_caller_version, caller_version)
            && caller < min
        {
            return Vec::new();
        }
        self.actions
            .iter()
            .filter(|a| self.is_allowed(a.name()))
            .filter(|a| {
                caller_version.is_none_or(|v| *v >= a.definition().minimum_supported_version)
            })
            .cloned()
            .collect()
    }

    /// Look up an action visible to `caller_version` by name.
    pub fn find(
        &self,
        name: &str,
        caller_version: Option<&Version>,
    ) -> Result<Arc<dyn DynAction>, ActionError> {
        self.all(caller_version)
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| ActionError::NotFound(name.to_owned()))
    }

    /// Names of every registered action, ignoring visibility rules.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn is_allowed(&self, name: &str) -> bool {
        self.config
            .allow_list
            .as_ref()
            .is_none_or(|list| list.iter().any(|allowed| allowed == name))
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
