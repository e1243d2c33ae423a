//! Language set registration on user setup

use crate::hooks::{
    Effect, Effects, HookContext, HookHandler, HookPayload, HookResult, HookType, HostEvent,
    LangSetDescriptor,
};

/// Makes the host load this extension's language strings on every request
pub struct LanguageSetupHandler {
    name: String,
}

impl LanguageSetupHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl HookHandler for LanguageSetupHandler {
    fn execute(&self, _context: &HookContext, payload: &HookPayload) -> HookResult<Effects> {
        match &payload.event {
            HostEvent::UserSetup(_) => {
                Ok(Effects::none().with(Effect::AppendLanguageSet(LangSetDescriptor::team_security())))
            }
            _ => Ok(Effects::none()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _context: &HookContext, payload: &HookPayload) -> bool {
        payload.hook_type() == HookType::UserSetup
    }
}
