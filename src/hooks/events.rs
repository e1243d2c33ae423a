//! Typed payloads for the host events the gateway handles
//!
//! Hosts hand over loosely shaped key/value payloads. Each hook gets its own
//! struct here; fields the gateway does not read are kept in `extra` so the
//! payload survives a decode/encode cycle unchanged.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hooks::{HookError, HookResult, HookType};

/// Host user identifier
pub type UserId = u32;

/// Host group identifier
pub type GroupId = u32;

/// Extension name used for language sets and mail templates
pub const EXTENSION_NAME: &str = "phpbb/teamsecurity";

/// Language set loaded on every user setup
pub const LANGUAGE_SET: &str = "info_acp_teamsecurity";

/// UCP account settings and ACP user overview
pub const PASSWORD_MODES: [&str; 2] = ["reg_details", "overview"];

/// A language resource the host should load for this request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangSetDescriptor {
    pub ext_name: String,
    pub lang_set: LangSet,
}

/// One language file or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LangSet {
    File(String),
    Files(Vec<String>),
}

impl From<&str> for LangSet {
    fn from(file: &str) -> Self {
        Self::File(file.to_string())
    }
}

impl From<String> for LangSet {
    fn from(file: String) -> Self {
        Self::File(file)
    }
}

impl From<Vec<String>> for LangSet {
    fn from(files: Vec<String>) -> Self {
        Self::Files(files)
    }
}

impl LangSetDescriptor {
    pub fn new(ext_name: impl Into<String>, lang_set: impl Into<LangSet>) -> Self {
        Self {
            ext_name: ext_name.into(),
            lang_set: lang_set.into(),
        }
    }

    /// The descriptor appended on user setup
    pub fn team_security() -> Self {
        Self::new(EXTENSION_NAME, LANGUAGE_SET)
    }
}

/// Subset of a host user row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    #[serde(default, deserialize_with = "lenient_user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRow {
    pub fn with_user_id(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            extra: Map::new(),
        }
    }
}

/// `user-setup` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSetupEvent {
    #[serde(default)]
    pub lang_set_ext: Vec<LangSetDescriptor>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by the ACP user overview and UCP module display hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayModuleEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_row: Option<UserRow>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DisplayModuleEvent {
    pub fn new(mode: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            mode: mode.into(),
            user_row: user_id.map(UserRow::with_user_id),
            extra: Map::new(),
        }
    }

    /// Whether the page being rendered lets the user pick a password
    pub fn is_password_mode(&self) -> bool {
        PASSWORD_MODES.contains(&self.mode.as_str())
    }

    /// User the page is about, if the host supplied one
    pub fn subject_user_id(&self) -> Option<UserId> {
        self.user_row.as_ref().and_then(|row| row.user_id)
    }
}

/// Result of the rejected login attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_row: Option<UserRow>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `login-failed` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginFailedEvent {
    #[serde(default)]
    pub result: LoginResult,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginFailedEvent {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            result: LoginResult {
                user_row: Some(UserRow::with_user_id(user_id)),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Account the failed attempt was made against
    pub fn subject_user_id(&self) -> Option<UserId> {
        self.result.user_row.as_ref().and_then(|row| row.user_id)
    }
}

/// `login-redirect` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginRedirectEvent {
    /// Login happened on the administration control panel
    #[serde(default, deserialize_with = "lenient_bool")]
    pub admin: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginRedirectEvent {
    pub fn new(admin: bool) -> Self {
        Self {
            admin,
            extra: Map::new(),
        }
    }
}

/// A host event with its typed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook", content = "payload", rename_all = "kebab-case")]
pub enum HostEvent {
    UserSetup(UserSetupEvent),
    AcpUserOverviewPreRender(DisplayModuleEvent),
    UcpDisplayPreRender(DisplayModuleEvent),
    LoginFailed(LoginFailedEvent),
    LoginRedirect(LoginRedirectEvent),
}

impl HostEvent {
    /// Decode an untyped host payload for the given hook
    pub fn from_value(hook_type: HookType, payload: Value) -> HookResult<Self> {
        let malformed = |e| HookError::malformed_payload(hook_type.name(), e);
        Ok(match hook_type {
            HookType::UserSetup => Self::UserSetup(serde_json::from_value(payload).map_err(malformed)?),
            HookType::AcpUserOverviewPreRender => {
                Self::AcpUserOverviewPreRender(serde_json::from_value(payload).map_err(malformed)?)
            }
            HookType::UcpDisplayPreRender => {
                Self::UcpDisplayPreRender(serde_json::from_value(payload).map_err(malformed)?)
            }
            HookType::LoginFailed => Self::LoginFailed(serde_json::from_value(payload).map_err(malformed)?),
            HookType::LoginRedirect => Self::LoginRedirect(serde_json::from_value(payload).map_err(malformed)?),
        })
    }

    /// Encode the payload back into the host's untyped form
    pub fn into_value(self) -> HookResult<Value> {
        let hook = self.hook_type().name();
        let encoded = match self {
            Self::UserSetup(event) => serde_json::to_value(event),
            Self::AcpUserOverviewPreRender(event) | Self::UcpDisplayPreRender(event) => {
                serde_json::to_value(event)
            }
            Self::LoginFailed(event) => serde_json::to_value(event),
            Self::LoginRedirect(event) => serde_json::to_value(event),
        };
        encoded.map_err(|e| HookError::malformed_payload(hook, e))
    }

    pub fn hook_type(&self) -> HookType {
        match self {
            Self::UserSetup(_) => HookType::UserSetup,
            Self::AcpUserOverviewPreRender(_) => HookType::AcpUserOverviewPreRender,
            Self::UcpDisplayPreRender(_) => HookType::UcpDisplayPreRender,
            Self::LoginFailed(_) => HookType::LoginFailed,
            Self::LoginRedirect(_) => HookType::LoginRedirect,
        }
    }
}

// Hosts are not consistent about ids and flags: ints, numeric strings, 0/1.

fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|id| UserId::try_from(id).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid user id: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid user id: {s:?}"))),
        Some(other) => Err(de::Error::custom(format!("invalid user id: {other}"))),
    }
}

// Anything but a string reads as "", which matches no mode
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !(s.is_empty() || s == "0"),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_setup_keeps_unknown_fields() {
        let payload = json!({
            "lang_set_ext": [{"ext_name": "acme/demo", "lang_set": "common"}],
            "user_lang_name": "en",
        });

        let event = HostEvent::from_value(HookType::UserSetup, payload.clone()).unwrap();
        match &event {
            HostEvent::UserSetup(setup) => assert_eq!(setup.lang_set_ext.len(), 1),
            other => panic!("Expected user setup event, got {other:?}"),
        }
        assert_eq!(event.into_value().unwrap(), payload);
    }

    #[test]
    fn test_display_module_user_id_variants() {
        let event: DisplayModuleEvent =
            serde_json::from_value(json!({"mode": "overview", "user_row": {"user_id": "42"}})).unwrap();
        assert_eq!(event.subject_user_id(), Some(42));
        assert!(event.is_password_mode());

        let event: DisplayModuleEvent = serde_json::from_value(json!({"mode": "front"})).unwrap();
        assert_eq!(event.subject_user_id(), None);
        assert!(!event.is_password_mode());

        let event: DisplayModuleEvent =
            serde_json::from_value(json!({"mode": "reg_details", "user_row": {"username": "bob"}})).unwrap();
        assert_eq!(event.subject_user_id(), None);
    }

    #[test]
    fn test_lang_set_file_lists_round_trip() {
        let payload = json!({
            "lang_set_ext": [
                {"ext_name": "acme/gallery", "lang_set": ["common", "info_acp_gallery"]},
                {"ext_name": "acme/demo", "lang_set": "common"},
            ],
        });

        let event = HostEvent::from_value(HookType::UserSetup, payload.clone()).unwrap();
        match &event {
            HostEvent::UserSetup(setup) => assert_eq!(
                setup.lang_set_ext[0],
                LangSetDescriptor::new(
                    "acme/gallery",
                    vec!["common".to_string(), "info_acp_gallery".to_string()]
                )
            ),
            other => panic!("Expected user setup event, got {other:?}"),
        }
        assert_eq!(event.into_value().unwrap(), payload);
    }

    #[test]
    fn test_display_module_odd_mode_reads_empty() {
        for mode in [json!(null), json!(3), json!(["reg_details"]), json!({"mode": "overview"})] {
            let event: DisplayModuleEvent =
                serde_json::from_value(json!({"id": "ucp_main", "mode": mode.clone()})).unwrap();
            assert_eq!(event.mode, "", "mode {mode}");
            assert!(!event.is_password_mode());
        }
    }

    #[test]
    fn test_login_redirect_admin_flag_forms() {
        for (raw, expected) in [
            (json!({"admin": true}), true),
            (json!({"admin": 1}), true),
            (json!({"admin": "1"}), true),
            (json!({"admin": 0}), false),
            (json!({"admin": ""}), false),
            (json!({"redirect": "index.php"}), false),
        ] {
            let event: LoginRedirectEvent = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(event.admin, expected, "payload {raw}");
        }
    }

    #[test]
    fn test_malformed_payload_reports_hook() {
        let err = HostEvent::from_value(HookType::LoginFailed, json!({"result": {"user_row": {"user_id": -3}}}))
            .unwrap_err();
        assert!(matches!(err, HookError::MalformedPayload { ref hook, .. } if hook == "login-failed"));
    }

    #[test]
    fn test_login_failed_subject() {
        let event = HostEvent::from_value(
            HookType::LoginFailed,
            json!({"result": {"status": 11, "user_row": {"user_id": 7}}, "username": "mod"}),
        )
        .unwrap();
        match event {
            HostEvent::LoginFailed(failed) => assert_eq!(failed.subject_user_id(), Some(7)),
            other => panic!("Expected login failed event, got {other:?}"),
        }
    }
}
