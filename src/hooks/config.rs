//! Settings read by the gateway and TOML configuration for embedding it

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hooks::{ConfigStore, HookError, HookResult, MemoryConfigStore, EXTENSION_NAME};

/// Host configuration keys
pub mod settings {
    /// Enforce stronger passwords for watched users
    pub const SEC_STRONG_PASS: &str = "sec_strong_pass";
    /// Log failed logins of watched users
    pub const SEC_LOGIN_ATTEMPTS: &str = "sec_login_attempts";
    /// Email on every ACP login
    pub const SEC_LOGIN_EMAIL: &str = "sec_login_email";
    /// Serialized list of watched group ids
    pub const SEC_USERGROUPS: &str = "sec_usergroups";
    /// Minimum password length for watched users
    pub const SEC_MIN_PASS_CHARS: &str = "sec_min_pass_chars";
    /// Recipient of ACP login notifications
    pub const SEC_CONTACT: &str = "sec_contact";

    pub const PASS_COMPLEX: &str = "pass_complex";
    pub const MIN_PASS_CHARS: &str = "min_pass_chars";
    pub const BOARD_CONTACT: &str = "board_contact";
    pub const BOARD_CONTACT_NAME: &str = "board_contact_name";

    /// Settings owned by this extension, with their install defaults
    pub const EXTENSION_DEFAULTS: [(&str, &str); 6] = [
        (SEC_STRONG_PASS, "0"),
        (SEC_LOGIN_ATTEMPTS, "0"),
        (SEC_LOGIN_EMAIL, "0"),
        (SEC_MIN_PASS_CHARS, "13"),
        (SEC_USERGROUPS, ""),
        (SEC_CONTACT, ""),
    ];
}

/// Host password complexity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PasswordComplexity {
    #[serde(rename = "PASS_TYPE_ANY")]
    Any,
    #[serde(rename = "PASS_TYPE_CASE")]
    Case,
    #[serde(rename = "PASS_TYPE_ALPHA")]
    Alpha,
    #[serde(rename = "PASS_TYPE_SYMBOL")]
    Symbol,
}

impl PasswordComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "PASS_TYPE_ANY",
            Self::Case => "PASS_TYPE_CASE",
            Self::Alpha => "PASS_TYPE_ALPHA",
            Self::Symbol => "PASS_TYPE_SYMBOL",
        }
    }
}

impl fmt::Display for PasswordComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordComplexity {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PASS_TYPE_ANY" => Ok(Self::Any),
            "PASS_TYPE_CASE" => Ok(Self::Case),
            "PASS_TYPE_ALPHA" => Ok(Self::Alpha),
            "PASS_TYPE_SYMBOL" => Ok(Self::Symbol),
            other => Err(HookError::invalid_config(format!(
                "unknown password complexity: {other}"
            ))),
        }
    }
}

/// Snapshot of the security settings for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    pub strong_password_enabled: bool,
    pub login_attempt_logging_enabled: bool,
    pub admin_login_email_enabled: bool,
    pub min_password_length: i64,
    pub contact_email: Option<String>,
    pub board_contact_name: String,
    pub board_contact_email: String,
}

impl SecurityConfig {
    /// Read the current values from the host store
    pub fn load(config: &dyn ConfigStore) -> Self {
        Self {
            strong_password_enabled: config.get_bool(settings::SEC_STRONG_PASS),
            login_attempt_logging_enabled: config.get_bool(settings::SEC_LOGIN_ATTEMPTS),
            admin_login_email_enabled: config.get_bool(settings::SEC_LOGIN_EMAIL),
            min_password_length: config.get_int(settings::SEC_MIN_PASS_CHARS),
            contact_email: config.get_non_empty(settings::SEC_CONTACT),
            board_contact_name: config.get(settings::BOARD_CONTACT_NAME).unwrap_or_default(),
            board_contact_email: config.get(settings::BOARD_CONTACT).unwrap_or_default(),
        }
    }

    /// Where ACP login notifications go
    pub fn notification_address(&self) -> &str {
        self.contact_email
            .as_deref()
            .unwrap_or(&self.board_contact_email)
    }
}

/// Gateway configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub mail: MailConfig,

    /// Host settings to seed an in-memory store with
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// Gateway-wide switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Whether the gateway reacts to events at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Level handler lifecycle events are traced at
    #[serde(default = "default_lifecycle_level")]
    pub lifecycle_log_level: String,
}

/// Mail template selection for ACP login notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_locale")]
    pub locale: String,
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> HookResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save configuration to TOML string
    pub fn to_toml(&self) -> HookResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> HookResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> HookResult<()> {
        for (field, value) in [
            ("mail.extension", &self.mail.extension),
            ("mail.template", &self.mail.template),
            ("mail.locale", &self.mail.locale),
        ] {
            if value.trim().is_empty() {
                return Err(HookError::invalid_config(format!("{field} cannot be empty")));
            }
        }

        self.system.lifecycle_level()?;

        for (key, value) in &self.settings {
            let known = settings::EXTENSION_DEFAULTS.iter().any(|(k, _)| k == key);
            if key.starts_with("sec_") && !known {
                return Err(HookError::invalid_config(format!("unknown setting: {key}")));
            }
            if key == settings::SEC_MIN_PASS_CHARS && value.trim().parse::<u32>().is_err() {
                return Err(HookError::invalid_config(format!(
                    "{key} must be a non-negative integer, got {value:?}"
                )));
            }
            if key == settings::PASS_COMPLEX {
                value.parse::<PasswordComplexity>()?;
            }
        }

        Ok(())
    }

    /// Build an in-memory store: extension defaults overlaid with `settings`
    pub fn seed_store(&self) -> MemoryConfigStore {
        MemoryConfigStore::from_pairs(
            settings::EXTENSION_DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .chain(self.settings.iter().map(|(k, v)| (k.clone(), v.clone()))),
        )
    }
}

impl SystemConfig {
    /// Parsed lifecycle trace level
    pub fn lifecycle_level(&self) -> HookResult<tracing::Level> {
        self.lifecycle_log_level.parse().map_err(|_| {
            HookError::invalid_config(format!(
                "unknown log level: {}",
                self.lifecycle_log_level
            ))
        })
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lifecycle_log_level: default_lifecycle_level(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            template: default_template(),
            locale: default_locale(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_lifecycle_level() -> String {
    "debug".to_string()
}

fn default_extension() -> String {
    EXTENSION_NAME.to_string()
}

fn default_template() -> String {
    "acp_login".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}
