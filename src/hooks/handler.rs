//! Hook handler trait

use crate::hooks::{Effects, HookContext, HookPayload, HookResult};

/// A handler reacting to one or more host hooks
///
/// `execute` decides and returns the effects to apply; it must not touch
/// host state itself.
pub trait HookHandler: Send + Sync {
    /// Execute the hook handler
    fn execute(&self, context: &HookContext, payload: &HookPayload) -> HookResult<Effects>;

    /// Get the handler name
    fn name(&self) -> &str;

    /// Check if the handler should run for the given context
    fn should_run(&self, _context: &HookContext, _payload: &HookPayload) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Effect, HostEvent, LoginRedirectEvent};

    struct TestHandler {
        name: String,
        effects: Effects,
    }

    impl HookHandler for TestHandler {
        fn execute(&self, _context: &HookContext, _payload: &HookPayload) -> HookResult<Effects> {
            Ok(self.effects.clone())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_sync_handler() {
        let handler = TestHandler {
            name: "test".to_string(),
            effects: Effects::none().with(Effect::set_config("pass_complex", "PASS_TYPE_SYMBOL")),
        };

        let context = HookContext::builder().build();
        let payload = HookPayload::new(HostEvent::LoginRedirect(LoginRedirectEvent::new(false)));

        let effects = handler.execute(&context, &payload).unwrap();
        assert_eq!(effects.len(), 1);
        assert!(handler.should_run(&context, &payload));
    }
}
