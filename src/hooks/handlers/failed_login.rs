//! Failed login auditing for watched users

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::hooks::{
    in_watch_group, Effect, Effects, GroupMembership, HookContext, HookHandler,
    HookPayload, HookResult, HostEvent, LogEntry, LoginFailedEvent, SecurityConfig, UserId,
};

/// Log category failed logins are written to
pub const USER_LOG: &str = "user";

/// Message key of the failed login entry
pub const LOG_TEAM_AUTH_FAIL: &str = "LOG_TEAM_AUTH_FAIL";

/// Writes a user log entry whenever a watched account fails to log in
pub struct FailedLoginHandler {
    name: String,
    groups: Arc<dyn GroupMembership>,
}

impl FailedLoginHandler {
    pub fn new(name: impl Into<String>, groups: Arc<dyn GroupMembership>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    pub fn plan(&self, context: &HookContext, event: &LoginFailedEvent) -> Effects {
        if !SecurityConfig::load(context.config()).login_attempt_logging_enabled {
            return Effects::none();
        }

        let user_id = event.subject_user_id().unwrap_or_else(|| context.user_id());
        if !in_watch_group(context.config(), self.groups.as_ref(), user_id) {
            return Effects::none();
        }

        tracing::info!(user_id, ip = %context.ip_address(), "Logging failed login of watched user");
        Effects::none().with(Effect::WriteLog(auth_fail_entry(context, user_id)))
    }
}

fn auth_fail_entry(context: &HookContext, user_id: UserId) -> LogEntry {
    LogEntry {
        category: USER_LOG.to_string(),
        user_id,
        ip: context.ip_address().to_string(),
        message_key: LOG_TEAM_AUTH_FAIL.to_string(),
        timestamp: context.now(),
        metadata: BTreeMap::from([("reportee_id".to_string(), json!(user_id))]),
    }
}

impl HookHandler for FailedLoginHandler {
    fn execute(&self, context: &HookContext, payload: &HookPayload) -> HookResult<Effects> {
        match &payload.event {
            HostEvent::LoginFailed(event) => Ok(self.plan(context, event)),
            _ => Ok(Effects::none()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _context: &HookContext, payload: &HookPayload) -> bool {
        matches!(payload.event, HostEvent::LoginFailed(_))
    }
}
