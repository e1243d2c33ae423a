//! Hook execution context

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hooks::{ConfigStore, MemoryConfigStore, SessionUser, UserId};

/// The user making the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub ip_address: String,
    pub username: String,
}

impl UserIdentity {
    /// Snapshot the ambient session
    pub fn from_session(session: &dyn SessionUser) -> Self {
        Self {
            user_id: session.current_user_id(),
            ip_address: session.current_ip(),
            username: session.current_username(),
        }
    }
}

/// Context passed to hook handlers during execution
///
/// Handlers never reach into the session or the host store directly; the
/// context carries the identity, clock and settings view for one request.
#[derive(Clone)]
pub struct HookContext {
    /// User of the current session
    session: UserIdentity,

    /// Time the request is handled at
    now: DateTime<Utc>,

    /// Request identifier for log correlation
    request_id: Option<String>,

    /// Host settings as seen by this request
    config: Arc<dyn ConfigStore>,
}

impl HookContext {
    /// Create a context for the given session user, timestamped now
    pub fn new(session: UserIdentity, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            session,
            now: Utc::now(),
            request_id: None,
            config,
        }
    }

    /// Create a builder for the context
    pub fn builder() -> HookContextBuilder {
        HookContextBuilder::default()
    }

    pub fn session(&self) -> &UserIdentity {
        &self.session
    }

    pub fn user_id(&self) -> UserId {
        self.session.user_id
    }

    pub fn ip_address(&self) -> &str {
        &self.session.ip_address
    }

    pub fn username(&self) -> &str {
        &self.session.username
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    /// Same request, reading settings from `config`
    pub fn with_config(mut self, config: Arc<dyn ConfigStore>) -> Self {
        self.config = config;
        self
    }

    /// Same request, tagged with `request_id` unless it already has one
    pub fn with_default_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id.get_or_insert_with(|| request_id.into());
        self
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("session", &self.session)
            .field("now", &self.now)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Builder for HookContext
#[derive(Default)]
pub struct HookContextBuilder {
    user_id: Option<UserId>,
    ip_address: Option<String>,
    username: Option<String>,
    now: Option<DateTime<Utc>>,
    request_id: Option<String>,
    config: Option<Arc<dyn ConfigStore>>,
}

impl HookContextBuilder {
    /// Take the identity from a live session
    pub fn with_session(mut self, session: &dyn SessionUser) -> Self {
        self.user_id = Some(session.current_user_id());
        self.ip_address = Some(session.current_ip());
        self.username = Some(session.current_username());
        self
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Pin the request clock
    pub fn with_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_config(mut self, config: Arc<dyn ConfigStore>) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context
    ///
    /// Unset identity fields default to the anonymous user (id 1) with an
    /// empty address. Without a store, every setting reads as unset.
    pub fn build(self) -> HookContext {
        HookContext {
            session: UserIdentity {
                user_id: self.user_id.unwrap_or(ANONYMOUS_USER_ID),
                ip_address: self.ip_address.unwrap_or_default(),
                username: self.username.unwrap_or_else(|| "Anonymous".to_string()),
            },
            now: self.now.unwrap_or_else(Utc::now),
            request_id: self.request_id,
            config: self
                .config
                .unwrap_or_else(|| Arc::new(MemoryConfigStore::new())),
        }
    }
}

/// Host id of the guest account
pub const ANONYMOUS_USER_ID: UserId = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::StaticSession;
    use chrono::TimeZone;

    #[test]
    fn test_context_builder() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 15, 4, 5).unwrap();
        let context = HookContext::builder()
            .with_user_id(2)
            .with_username("admin")
            .with_ip_address("203.0.113.9")
            .with_time(at)
            .with_request_id("req-123")
            .build();

        assert_eq!(context.user_id(), 2);
        assert_eq!(context.username(), "admin");
        assert_eq!(context.ip_address(), "203.0.113.9");
        assert_eq!(context.now(), at);
        assert_eq!(context.request_id(), Some("req-123"));
    }

    #[test]
    fn test_context_defaults_to_anonymous() {
        let context = HookContext::builder().build();
        assert_eq!(context.user_id(), ANONYMOUS_USER_ID);
        assert_eq!(context.ip_address(), "");
        assert!(context.request_id().is_none());

        let context = context.with_default_request_id("req-1").with_default_request_id("req-2");
        assert_eq!(context.request_id(), Some("req-1"));
    }

    #[test]
    fn test_context_from_session() {
        let session = StaticSession::new(54, "198.51.100.7", "moderator");
        let config = Arc::new(MemoryConfigStore::from_pairs([("sec_login_email", "1")]));
        let context = HookContext::new(UserIdentity::from_session(&session), config);
        assert_eq!(context.user_id(), 54);
        assert_eq!(context.ip_address(), "198.51.100.7");
        assert_eq!(context.username(), "moderator");

        assert!(context.config().get_bool("sec_login_email"));

        let built = HookContext::builder().with_session(&session).build();
        assert_eq!(built.session(), context.session());
        assert!(built.config().get("sec_login_email").is_none());
    }
}
