//! Core types for the hooks system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use chrono::{DateTime, Utc};

use crate::hooks::{HookError, HostEvent};

/// The host lifecycle hooks the gateway subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    /// User session and language setup
    UserSetup,

    /// Admin control panel, user overview page about to render
    AcpUserOverviewPreRender,

    /// User control panel module about to render
    UcpDisplayPreRender,

    /// Login form rejected the submitted credentials
    LoginFailed,

    /// Login succeeded and the user is about to be redirected
    LoginRedirect,
}

impl HookType {
    /// Get all hook types
    pub fn all() -> [Self; 5] {
        [
            Self::UserSetup,
            Self::AcpUserOverviewPreRender,
            Self::UcpDisplayPreRender,
            Self::LoginFailed,
            Self::LoginRedirect,
        ]
    }

    /// Short event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserSetup => "user-setup",
            Self::AcpUserOverviewPreRender => "acp-user-overview-pre-render",
            Self::UcpDisplayPreRender => "ucp-display-pre-render",
            Self::LoginFailed => "login-failed",
            Self::LoginRedirect => "login-redirect",
        }
    }

    /// Event name as dispatched by the host
    pub fn host_event_name(&self) -> &'static str {
        match self {
            Self::UserSetup => "core.user_setup",
            Self::AcpUserOverviewPreRender => "core.acp_users_overview_before",
            Self::UcpDisplayPreRender => "core.ucp_display_module_before",
            Self::LoginFailed => "core.login_box_failed",
            Self::LoginRedirect => "core.login_box_redirect",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HookType {
    type Err = HookError;

    /// Accepts both the short name and the host event name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|hook| hook.name() == s || hook.host_event_name() == s)
            .ok_or_else(|| HookError::UnknownHook(s.to_string()))
    }
}

/// Hook execution priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HookPriority(pub u16);

impl HookPriority {
    pub const HIGHEST: Self = Self(0);
    pub const HIGH: Self = Self(100);
    pub const NORMAL: Self = Self(500);
    pub const LOW: Self = Self(900);
    pub const LOWEST: Self = Self(1000);
}

impl Default for HookPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Payload passed to hook handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    /// Timestamp when the hook was triggered
    pub timestamp: DateTime<Utc>,

    /// Unique identifier for this hook execution
    pub execution_id: String,

    /// Typed event data
    pub event: HostEvent,
}

impl HookPayload {
    /// Create a new hook payload
    pub fn new(event: HostEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            execution_id: uuid::Uuid::new_v4().to_string(),
            event,
        }
    }

    /// Hook type of the carried event
    pub fn hook_type(&self) -> HookType {
        self.event.hook_type()
    }
}

/// Hook execution statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookStats {
    /// Total number of executions
    pub total_executions: u64,

    /// Number of successful executions
    pub successful_executions: u64,

    /// Number of failed executions
    pub failed_executions: u64,

    /// Number of executions that produced at least one effect
    pub applied_executions: u64,

    /// Average execution time
    pub average_duration: Option<Duration>,

    /// Maximum execution time
    pub max_duration: Option<Duration>,

    /// Last execution time
    pub last_execution: Option<DateTime<Utc>>,
}

impl HookStats {
    /// Record a successful execution
    pub fn record_success(&mut self, duration: Duration, applied: bool) {
        self.total_executions += 1;
        self.successful_executions += 1;
        if applied {
            self.applied_executions += 1;
        }
        self.last_execution = Some(Utc::now());
        self.update_duration_stats(duration);
    }

    /// Record a failed execution
    pub fn record_failure(&mut self, duration: Duration) {
        self.total_executions += 1;
        self.failed_executions += 1;
        self.last_execution = Some(Utc::now());
        self.update_duration_stats(duration);
    }

    fn update_duration_stats(&mut self, duration: Duration) {
        self.average_duration = Some(match self.average_duration {
            Some(avg) => {
                let total_nanos = avg.as_nanos() * u128::from(self.total_executions - 1);
                let new_total = total_nanos + duration.as_nanos();
                Duration::from_nanos((new_total / u128::from(self.total_executions)) as u64)
            }
            None => duration,
        });

        self.max_duration = Some(match self.max_duration {
            Some(max) if max >= duration => max,
            _ => duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_type_display() {
        assert_eq!(HookType::LoginFailed.to_string(), "login-failed");
        assert_eq!(HookType::UserSetup.host_event_name(), "core.user_setup");
    }

    #[test]
    fn test_hook_type_from_either_name() {
        assert_eq!("login-redirect".parse::<HookType>().unwrap(), HookType::LoginRedirect);
        assert_eq!(
            "core.ucp_display_module_before".parse::<HookType>().unwrap(),
            HookType::UcpDisplayPreRender
        );
        assert!(matches!(
            "core.page_header".parse::<HookType>(),
            Err(HookError::UnknownHook(_))
        ));
    }

    #[test]
    fn test_hook_type_serde_uses_short_name() {
        let json = serde_json::to_string(&HookType::AcpUserOverviewPreRender).unwrap();
        assert_eq!(json, "\"acp-user-overview-pre-render\"");
    }

    #[test]
    fn test_hook_priority_ordering() {
        assert!(HookPriority::HIGHEST < HookPriority::HIGH);
        assert!(HookPriority::HIGH < HookPriority::NORMAL);
        assert!(HookPriority::NORMAL < HookPriority::LOW);
        assert!(HookPriority::LOW < HookPriority::LOWEST);
    }

    #[test]
    fn test_hook_stats() {
        let mut stats = HookStats::default();

        stats.record_success(Duration::from_millis(100), true);
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.successful_executions, 1);
        assert_eq!(stats.applied_executions, 1);
        assert_eq!(stats.average_duration, Some(Duration::from_millis(100)));

        stats.record_failure(Duration::from_millis(200));
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.failed_executions, 1);
        assert_eq!(stats.average_duration, Some(Duration::from_millis(150)));
        assert_eq!(stats.max_duration, Some(Duration::from_millis(200)));

        stats.record_success(Duration::from_millis(30), false);
        assert_eq!(stats.applied_executions, 1);
        assert_eq!(stats.max_duration, Some(Duration::from_millis(200)));
    }
}
