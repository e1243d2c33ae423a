//! Stronger password requirements for watched users

use std::sync::Arc;

use crate::hooks::{
    in_watch_group, settings, DisplayModuleEvent, Effect, Effects, GroupMembership, HookContext,
    HookHandler, HookPayload, HookResult, HostEvent, PasswordComplexity, SecurityConfig,
};

/// Raises the host password rules while a watched user's password form renders
///
/// Applies to the UCP account settings page and the ACP user overview. The
/// host reads `pass_complex` and `min_pass_chars` later in the same request,
/// so patching them here tightens validation for that form only.
pub struct PasswordPolicyHandler {
    name: String,
    groups: Arc<dyn GroupMembership>,
}

impl PasswordPolicyHandler {
    pub fn new(name: impl Into<String>, groups: Arc<dyn GroupMembership>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    /// Decide the settings patch for one display event
    pub fn plan(&self, context: &HookContext, event: &DisplayModuleEvent) -> Effects {
        let config = context.config();
        let security = SecurityConfig::load(config);
        if !security.strong_password_enabled || !event.is_password_mode() {
            return Effects::none();
        }

        let user_id = event.subject_user_id().unwrap_or_else(|| context.user_id());
        if !in_watch_group(config, self.groups.as_ref(), user_id) {
            tracing::debug!(user_id, mode = %event.mode, "User not in a watch group, password rules unchanged");
            return Effects::none();
        }

        let min_chars = config
            .get_int(settings::MIN_PASS_CHARS)
            .max(security.min_password_length);

        tracing::info!(user_id, mode = %event.mode, min_chars, "Applying team password requirements");

        Effects::none()
            .with(Effect::set_config(
                settings::PASS_COMPLEX,
                PasswordComplexity::Symbol.as_str(),
            ))
            .with(Effect::set_config(settings::MIN_PASS_CHARS, min_chars.to_string()))
    }
}

impl HookHandler for PasswordPolicyHandler {
    fn execute(&self, context: &HookContext, payload: &HookPayload) -> HookResult<Effects> {
        match &payload.event {
            HostEvent::AcpUserOverviewPreRender(event) | HostEvent::UcpDisplayPreRender(event) => {
                Ok(self.plan(context, event))
            }
            _ => Ok(Effects::none()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _context: &HookContext, payload: &HookPayload) -> bool {
        matches!(
            payload.event,
            HostEvent::AcpUserOverviewPreRender(_) | HostEvent::UcpDisplayPreRender(_)
        )
    }
}
