use actionhub_core::{ActionForm, ActionRequest, ActionResponse};
use async_trait::async_trait;

use crate::definition::ActionDefinition;
use crate::error::ActionError;

/// Strongly-typed action trait with native `async fn`.
///
/// Implementations may assume every request reaching [`execute`](Self::execute)
/// has already been validated against the [`ActionDefinition`]: the type is
/// supported, required parameters are present, and streaming actions have
/// data to stream.
///
/// This trait is **not** object-safe. Every `Action` automatically implements
/// [`DynAction`] for use behind `Arc<dyn DynAction>`.
pub trait Action: Send + Sync {
    /// Static description of the action.
    fn definition(&self) -> &ActionDefinition;

    /// Deliver the request to the destination.
    ///
    /// Failures reported by the destination should be returned as
    /// [`ActionError::Destination`].
    fn execute(
        &self,
        request: &ActionRequest,
    ) -> impl std::future::Future<Output = Result<ActionResponse, ActionError>> + Send;

    /// Whether the action can be executed. Form-only actions override this.
    fn has_execute(&self) -> bool {
        true
    }

    /// Whether the action produces a configuration form.
    fn has_form(&self) -> bool {
        false
    }

    /// Build the configuration form shown before execution.
    fn form(
        &self,
        _request: &ActionRequest,
    ) -> impl std::future::Future<Output = Result<ActionForm, ActionError>> + Send {
        async { Err(ActionError::NoForm) }
    }
}

/// Object-safe action trait for use behind `Arc<dyn DynAction>`.
///
/// You generally should not implement this trait directly -- instead implement
/// [`Action`] and rely on the blanket implementation.
#[async_trait]
pub trait DynAction: Send + Sync {
    fn definition(&self) -> &ActionDefinition;

    async fn execute(&self, request: &ActionRequest) -> Result<ActionResponse, ActionError>;

    fn has_execute(&self) -> bool {
        true
    }

    fn has_form(&self) -> bool {
        false
    }

    async fn form(&self, _request: &ActionRequest) -> Result<ActionForm, ActionError> {
        Err(ActionError::NoForm)
    }

    /// The action's unique name.
    fn name(&self) -> &str {
        &self.definition().name
    }
}

#[async_trait]
impl<T: Action + Sync> DynAction for T {
    fn definition(&self) -> &ActionDefinition {
        Action::definition(self)
    }

    async fn execute(&self, request: &ActionRequest) -> Result<ActionResponse, ActionError> {
        Action::execute(self, request).await
    }

    fn has_execute(&self) -> bool {
        Action::has_execute(self)
    }

    fn has_form(&self) -> bool {
        Action::has_form(self)
    }

    async fn form(&self, request: &ActionRequest) -> Result<ActionForm, ActionError> {
        Action::form(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actionhub_core::{ActionType, FormField};

    use super::*;

    struct MockAction {
        definition: ActionDefinition,
        should_fail: bool,
    }

    impl MockAction {
        fn new(name: &str, should_fail: bool) -> Self {
            Self {
                definition: ActionDefinition::new(name, "Mock", "mock", vec![ActionType::Query]),
                should_fail,
            }
        }
    }

    impl Action for MockAction {
        fn definition(&self) -> &ActionDefinition {
            &self.definition
        }

        async fn execute(&self, _request: &ActionRequest) -> Result<ActionResponse, ActionError> {
            if self.should_fail {
                return Err(ActionError::Destination("mock failure".into()));
            }
            Ok(ActionResponse::success("sent"))
        }
    }

    struct FormAction {
        definition: ActionDefinition,
    }

    impl Action for FormAction {
        fn definition(&self) -> &ActionDefinition {
            &self.definition
        }

        async fn execute(&self, _request: &ActionRequest) -> Result<ActionResponse, ActionError> {
            Ok(ActionResponse::default())
        }

        fn has_form(&self) -> bool {
            true
        }

        async fn form(&self, _request: &ActionRequest) -> Result<ActionForm, ActionError> {
            Ok(ActionForm::new(vec![FormField::new("channel")]))
        }
    }

    #[tokio::test]
    async fn action_execute_success() {
        let action = MockAction::new("test", false);
        let resp = Action::execute(&action, &ActionRequest::default())
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.message.as_deref(), Some("sent"));
    }

    #[tokio::test]
    async fn action_execute_failure() {
        let action = MockAction::new("test", true);
        let err = Action::execute(&action, &ActionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Destination(_)));
    }

    #[tokio::test]
    async fn blanket_dyn_action_impl() {
        let action: Arc<dyn DynAction> = Arc::new(MockAction::new("dyn-test", false));
        assert_eq!(action.name(), "dyn-test");
        assert!(action.has_execute());
        assert!(!action.has_form());
        let err = action.form(&ActionRequest::default()).await.unwrap_err();
        assert!(matches!(err, ActionError::NoForm));
    }

    #[tokio::test]
    async fn dyn_form_dispatches_to_override() {
        let action: Arc<dyn DynAction> = Arc::new(FormAction {
            definition: ActionDefinition::new("form", "Form", "", vec![ActionType::Cell]),
        });
        assert!(action.has_form());
        let form = action.form(&ActionRequest::default()).await.unwrap();
        assert_eq!(form.fields.len(), 1);
    }
}
