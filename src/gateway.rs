//! Policy gateway: the surface a forum host talks to
//!
//! The gateway subscribes its four policy handlers to the host hooks, turns
//! each dispatch into a typed [`HostEvent`], lets the handlers decide and
//! applies what they decided through the host services.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::hooks::{
    in_watch_group, AdminLoginHandler, DisplayModuleEvent, EffectApplier, Effects,
    FailedLoginHandler, GatewayConfig, HookContext, HookError, HookManager, HookPayload,
    HookPriority, HookResult, HookType, HostEvent, LanguageSetupHandler, LoggingObserver,
    LoginFailedEvent, LoginRedirectEvent, PasswordPolicyHandler, RequestConfig, Services,
    SessionUser, UserId, UserIdentity, UserSetupEvent,
};

/// Host hooks and the handler subscribed to each
pub const SUBSCRIPTIONS: [(HookType, &str); 5] = [
    (HookType::AcpUserOverviewPreRender, PASSWORD_POLICY),
    (HookType::UcpDisplayPreRender, PASSWORD_POLICY),
    (HookType::LoginFailed, FAILED_LOGIN),
    (HookType::LoginRedirect, ADMIN_LOGIN),
    (HookType::UserSetup, LANGUAGE_SETUP),
];

pub const LANGUAGE_SETUP: &str = "load_language_on_setup";
pub const PASSWORD_POLICY: &str = "set_team_password_configs";
pub const FAILED_LOGIN: &str = "log_failed_login_attempts";
pub const ADMIN_LOGIN: &str = "acp_login_notification";

/// The team security policy gateway
pub struct PolicyGateway {
    services: Services,
    session: Arc<dyn SessionUser>,
    manager: HookManager,
}

impl PolicyGateway {
    /// Wire the gateway to the host services and subscribe its handlers
    pub fn new(
        services: Services,
        session: Arc<dyn SessionUser>,
        config: &GatewayConfig,
    ) -> HookResult<Self> {
        config.validate()?;

        let mut manager = HookManager::new();
        manager.set_enabled(config.system.enabled);
        manager
            .lifecycle()
            .register_observer(Arc::new(LoggingObserver::new(config.system.lifecycle_level()?)))
            .map_err(HookError::custom)?;

        manager.register(
            LANGUAGE_SETUP,
            subscribed_hooks(LANGUAGE_SETUP),
            LanguageSetupHandler::new(LANGUAGE_SETUP),
            HookPriority::NORMAL,
        )?;
        manager.register(
            PASSWORD_POLICY,
            subscribed_hooks(PASSWORD_POLICY),
            PasswordPolicyHandler::new(PASSWORD_POLICY, services.groups.clone()),
            HookPriority::NORMAL,
        )?;
        manager.register(
            FAILED_LOGIN,
            subscribed_hooks(FAILED_LOGIN),
            FailedLoginHandler::new(FAILED_LOGIN, services.groups.clone()),
            HookPriority::NORMAL,
        )?;
        manager.register(
            ADMIN_LOGIN,
            subscribed_hooks(ADMIN_LOGIN),
            AdminLoginHandler::new(ADMIN_LOGIN, config.mail.clone()),
            HookPriority::NORMAL,
        )?;

        tracing::debug!(enabled = manager.is_enabled(), "Team security gateway ready");

        Ok(Self {
            services,
            session,
            manager,
        })
    }

    /// Host event names this gateway listens to, with the handler for each
    pub fn subscribed_events() -> Vec<(&'static str, &'static str)> {
        SUBSCRIPTIONS
            .iter()
            .map(|(hook, handler)| (hook.host_event_name(), *handler))
            .collect()
    }

    /// Context for the current request, taken from the session
    pub fn context(&self) -> HookContext {
        HookContext::new(
            UserIdentity::from_session(self.session.as_ref()),
            self.services.config.clone(),
        )
    }

    /// Start a request for the session user
    ///
    /// Settings changed while handling the request are visible to later
    /// dispatches on the same request only.
    pub fn request(&self) -> GatewayRequest<'_> {
        self.request_for(self.context())
    }

    /// Start a request with an explicit context
    ///
    /// The context's settings view is replaced by a fresh overlay over the
    /// host store.
    pub fn request_for(&self, context: HookContext) -> GatewayRequest<'_> {
        let config = Arc::new(RequestConfig::new(self.services.config.clone()));
        let services = Services {
            config: config.clone(),
            ..self.services.clone()
        };
        let context = context
            .with_config(config.clone())
            .with_default_request_id(Uuid::new_v4().to_string());

        GatewayRequest {
            gateway: self,
            context,
            config,
            services,
        }
    }

    /// Dispatch an untyped host payload as a request of its own
    ///
    /// `hook` may be the host event name or the short name. Returns the
    /// payload after handlers ran, including fields the gateway ignores.
    pub fn dispatch(&self, hook: &str, payload: Value) -> HookResult<Value> {
        self.request().dispatch(hook, payload)
    }

    /// Dispatch a typed event as a request of its own
    pub fn dispatch_event(&self, event: HostEvent) -> HookResult<HostEvent> {
        self.request().dispatch_event(event)
    }

    /// Dispatch a typed event with an explicit context
    pub fn dispatch_with_context(&self, context: &HookContext, event: HostEvent) -> HookResult<HostEvent> {
        self.request_for(context.clone()).dispatch_event(event)
    }

    /// What the handlers would do for this event, without doing it
    pub fn plan(&self, context: &HookContext, event: HostEvent) -> HookResult<Effects> {
        self.request_for(context.clone()).plan(event)
    }

    pub fn handle_language_setup(&self, event: UserSetupEvent) -> HookResult<UserSetupEvent> {
        self.request().handle_language_setup(event)
    }

    pub fn handle_password_policy(&self, hook: HookType, event: DisplayModuleEvent) -> HookResult<()> {
        self.request().handle_password_policy(hook, event)
    }

    pub fn handle_failed_login(&self, event: LoginFailedEvent) -> HookResult<()> {
        self.request().handle_failed_login(event)
    }

    pub fn handle_admin_login(&self, event: LoginRedirectEvent) -> HookResult<()> {
        self.request().handle_admin_login(event)
    }

    /// Whether the user is in any configured watch group
    pub fn in_watch_group(&self, user_id: UserId) -> bool {
        in_watch_group(
            self.services.config.as_ref(),
            self.services.groups.as_ref(),
            user_id,
        )
    }

    /// Registry access for enabling, disabling and inspecting handlers
    pub fn manager(&self) -> &HookManager {
        &self.manager
    }
}

/// One host request
///
/// Every dispatch on a request shares its settings view, so a password form
/// rendered after [`handle_password_policy`](Self::handle_password_policy)
/// sees the tightened settings. The host store never does.
pub struct GatewayRequest<'g> {
    gateway: &'g PolicyGateway,
    context: HookContext,
    config: Arc<RequestConfig>,
    services: Services,
}

impl GatewayRequest<'_> {
    pub fn context(&self) -> &HookContext {
        &self.context
    }

    /// Settings as this request sees them
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Dispatch an untyped host payload
    pub fn dispatch(&self, hook: &str, payload: Value) -> HookResult<Value> {
        let hook_type: HookType = hook.parse()?;
        let event = HostEvent::from_value(hook_type, payload)?;
        self.dispatch_event(event)?.into_value()
    }

    pub fn dispatch_event(&self, event: HostEvent) -> HookResult<HostEvent> {
        self.gateway
            .manager
            .execute(&self.context, event, &EffectApplier::new(&self.services))
    }

    /// What the handlers would do for this event, without doing it
    pub fn plan(&self, event: HostEvent) -> HookResult<Effects> {
        self.gateway
            .manager
            .plan(&self.context, &HookPayload::new(event))
    }

    /// Append this extension's language set
    pub fn handle_language_setup(&self, event: UserSetupEvent) -> HookResult<UserSetupEvent> {
        match self.dispatch_event(HostEvent::UserSetup(event))? {
            HostEvent::UserSetup(event) => Ok(event),
            other => Err(HookError::custom(format!(
                "unexpected event after user setup: {}",
                other.hook_type()
            ))),
        }
    }

    /// Tighten password settings for a watched user's password form
    ///
    /// `hook` must be one of the two display hooks.
    pub fn handle_password_policy(&self, hook: HookType, event: DisplayModuleEvent) -> HookResult<()> {
        let event = match hook {
            HookType::AcpUserOverviewPreRender => HostEvent::AcpUserOverviewPreRender(event),
            HookType::UcpDisplayPreRender => HostEvent::UcpDisplayPreRender(event),
            other => return Err(HookError::UnknownHook(format!("{other} is not a display hook"))),
        };
        self.dispatch_event(event).map(|_| ())
    }

    /// Log a failed login if the account is watched
    pub fn handle_failed_login(&self, event: LoginFailedEvent) -> HookResult<()> {
        self.dispatch_event(HostEvent::LoginFailed(event)).map(|_| ())
    }

    /// Notify the board contact of an ACP login
    pub fn handle_admin_login(&self, event: LoginRedirectEvent) -> HookResult<()> {
        self.dispatch_event(HostEvent::LoginRedirect(event)).map(|_| ())
    }
}

fn subscribed_hooks(handler: &str) -> Vec<HookType> {
    SUBSCRIPTIONS
        .iter()
        .filter(|(_, name)| *name == handler)
        .map(|(hook, _)| *hook)
        .collect()
}
