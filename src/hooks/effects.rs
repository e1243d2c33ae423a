//! Side effects produced by handlers and their application
//!
//! Handlers only decide. What they decide is returned as [`Effects`], and an
//! [`EffectApplier`] carries it out against the host services and the event
//! payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::{HookError, HookResult, HostEvent, LangSetDescriptor, Services, UserId};

/// A single change a handler wants made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Overwrite a host setting
    SetConfig { key: String, value: String },

    /// Append to the event's `lang_set_ext`
    AppendLanguageSet(LangSetDescriptor),

    /// Write an entry to the host log
    WriteLog(LogEntry),

    /// Send a templated email
    SendEmail(EmailRequest),
}

impl Effect {
    pub fn set_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SetConfig {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A host log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub category: String,
    pub user_id: UserId,
    pub ip: String,
    pub message_key: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
}

/// A templated email addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub extension: String,
    pub template: String,
    pub locale: String,
    pub to_address: String,
    pub to_name: String,
    pub vars: BTreeMap<String, String>,
}

/// Ordered effects of one handler execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effects(Vec<Effect>);

impl Effects {
    /// Nothing to do
    pub fn none() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    pub fn with(mut self, effect: Effect) -> Self {
        self.push(effect);
        self
    }

    pub fn extend(&mut self, other: Effects) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.0.iter()
    }
}

impl From<Vec<Effect>> for Effects {
    fn from(effects: Vec<Effect>) -> Self {
        Self(effects)
    }
}

impl IntoIterator for Effects {
    type Item = Effect;
    type IntoIter = std::vec::IntoIter<Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Carries out effects against the host services
pub struct EffectApplier<'a> {
    services: &'a Services,
}

impl<'a> EffectApplier<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Apply effects in order, stopping at the first failure
    pub fn apply(&self, effects: Effects, event: &mut HostEvent) -> HookResult<()> {
        for effect in effects {
            self.apply_one(effect, event)?;
        }
        Ok(())
    }

    fn apply_one(&self, effect: Effect, event: &mut HostEvent) -> HookResult<()> {
        match effect {
            Effect::SetConfig { key, value } => {
                tracing::debug!(%key, %value, "Updating host setting");
                self.services
                    .config
                    .set(&key, &value)
                    .map_err(|e| HookError::service("config store", e))
            }
            Effect::AppendLanguageSet(descriptor) => match event {
                HostEvent::UserSetup(setup) => {
                    setup.lang_set_ext.push(descriptor);
                    Ok(())
                }
                other => Err(HookError::custom(format!(
                    "cannot add a language set during {}",
                    other.hook_type()
                ))),
            },
            Effect::WriteLog(entry) => self
                .services
                .log
                .add(
                    &entry.category,
                    entry.user_id,
                    &entry.ip,
                    &entry.message_key,
                    entry.timestamp,
                    &entry.metadata,
                )
                .map_err(|e| HookError::service("log store", e)),
            Effect::SendEmail(request) => {
                let mut mail = self.services.mailer.compose();
                mail.set_template(&request.extension, &request.template, &request.locale);
                mail.to(&request.to_address, &request.to_name);
                mail.assign_vars(&request.vars);
                mail.send().map_err(|e| HookError::service("mailer", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{
        ConfigStore, LoginRedirectEvent, MemoryConfigStore, MemoryLogStore, RecordingMailer,
        StaticGroupMembership, UserSetupEvent,
    };
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        config: Arc<MemoryConfigStore>,
        log: Arc<MemoryLogStore>,
        mailer: Arc<RecordingMailer>,
        services: Services,
    }

    fn fixture(mailer: RecordingMailer) -> Fixture {
        let config = Arc::new(MemoryConfigStore::new());
        let log = Arc::new(MemoryLogStore::new());
        let mailer = Arc::new(mailer);
        let services = Services::new(
            config.clone(),
            log.clone(),
            mailer.clone(),
            Arc::new(StaticGroupMembership::new()),
        );
        Fixture {
            config,
            log,
            mailer,
            services,
        }
    }

    #[test]
    fn test_apply_effects_in_order() {
        let fx = fixture(RecordingMailer::new());
        let mut event = HostEvent::UserSetup(UserSetupEvent::default());

        let effects = Effects::none()
            .with(Effect::set_config("min_pass_chars", "8"))
            .with(Effect::set_config("min_pass_chars", "13"))
            .with(Effect::AppendLanguageSet(LangSetDescriptor::team_security()))
            .with(Effect::WriteLog(LogEntry {
                category: "user".into(),
                user_id: 5,
                ip: "10.1.1.1".into(),
                message_key: "LOG_TEAM_AUTH_FAIL".into(),
                timestamp: Utc::now(),
                metadata: BTreeMap::from([("reportee_id".to_string(), json!(5))]),
            }))
            .with(Effect::SendEmail(EmailRequest {
                extension: "phpbb/teamsecurity".into(),
                template: "acp_login".into(),
                locale: "en".into(),
                to_address: "board@example.com".into(),
                to_name: "Board".into(),
                vars: BTreeMap::new(),
            }));
        assert_eq!(effects.len(), 5);

        EffectApplier::new(&fx.services).apply(effects, &mut event).unwrap();

        assert_eq!(fx.config.get("min_pass_chars").as_deref(), Some("13"));
        assert_eq!(fx.log.records().len(), 1);
        assert_eq!(fx.mailer.sent().len(), 1);
        match event {
            HostEvent::UserSetup(setup) => {
                assert_eq!(setup.lang_set_ext, vec![LangSetDescriptor::team_security()])
            }
            other => panic!("Expected user setup event, got {other:?}"),
        }
    }

    #[test]
    fn test_language_set_rejected_for_other_hooks() {
        let fx = fixture(RecordingMailer::new());
        let mut event = HostEvent::LoginRedirect(LoginRedirectEvent::new(true));
        let effects = Effects::none().with(Effect::AppendLanguageSet(LangSetDescriptor::team_security()));

        let err = EffectApplier::new(&fx.services).apply(effects, &mut event).unwrap_err();
        assert!(err.to_string().contains("login-redirect"));
    }

    #[test]
    fn test_mailer_failure_propagates() {
        let fx = fixture(RecordingMailer::failing("relay unavailable"));
        let mut event = HostEvent::LoginRedirect(LoginRedirectEvent::new(true));
        let effects = Effects::none().with(Effect::SendEmail(EmailRequest {
            extension: "phpbb/teamsecurity".into(),
            template: "acp_login".into(),
            locale: "en".into(),
            to_address: "board@example.com".into(),
            to_name: "Board".into(),
            vars: BTreeMap::new(),
        }));

        let err = EffectApplier::new(&fx.services).apply(effects, &mut event).unwrap_err();
        assert!(matches!(err, HookError::Service { service: "mailer", .. }));
        assert_eq!(err.to_string(), "mailer failed: relay unavailable");
    }
}
