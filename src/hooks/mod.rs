//! Team security hooks system
//!
//! Host events arrive as typed [`HostEvent`]s, registered handlers decide
//! what should happen as [`Effects`], and an [`EffectApplier`] carries those
//! out against the host [`Services`].

pub mod config;
pub mod context;
pub mod effects;
pub mod errors;
pub mod events;
pub mod handler;
pub mod handlers;
pub mod lifecycle;
pub mod manager;
pub mod memory;
pub mod services;
pub mod types;
pub mod watch_group;

// Re-export commonly used types
pub use self::config::{
    settings, GatewayConfig, MailConfig, PasswordComplexity, SecurityConfig, SystemConfig,
};
pub use self::context::{HookContext, HookContextBuilder, UserIdentity, ANONYMOUS_USER_ID};
pub use self::effects::{Effect, EffectApplier, Effects, EmailRequest, LogEntry};
pub use self::errors::{HookError, HookResult};
pub use self::events::{
    DisplayModuleEvent, GroupId, HostEvent, LangSet, LangSetDescriptor, LoginFailedEvent,
    LoginRedirectEvent, LoginResult, UserId, UserRow, UserSetupEvent, EXTENSION_NAME,
    LANGUAGE_SET, PASSWORD_MODES,
};
pub use self::handler::HookHandler;
pub use self::handlers::{
    format_login_time, AdminLoginHandler, FailedLoginHandler, LanguageSetupHandler,
    PasswordPolicyHandler, LOG_TEAM_AUTH_FAIL, USER_LOG,
};
pub use self::lifecycle::{
    HookLifecycle, HookLifecycleEvent, HookPhase, LifecycleObserver, LoggingObserver,
};
pub use self::manager::HookManager;
pub use self::memory::{
    LogRecord, MemoryConfigStore, MemoryLogStore, RecordingMailer, RequestConfig, SentMail,
    StaticGroupMembership, StaticSession,
};
pub use self::services::{
    parse_leading_int, ConfigStore, GroupMembership, LogStore, Mailer, OutgoingMail, Services,
    SessionUser,
};
pub use self::types::{HookPayload, HookPriority, HookStats, HookType};
pub use self::watch_group::{in_watch_group, WatchGroups};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        ConfigStore, Effect, Effects, GroupMembership, HookContext, HookError, HookHandler,
        HookManager, HookPayload, HookPriority, HookResult, HookType, HostEvent, LogStore, Mailer,
        Services, SessionUser,
    };
}
