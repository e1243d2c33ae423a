//! Host collaborator interfaces
//!
//! The gateway owns no storage, mail transport or session handling. Hosts
//! implement these traits over their own subsystems and hand them to the
//! gateway once at startup.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::hooks::{GroupId, UserId};

/// Host configuration storage
pub trait ConfigStore: Send + Sync {
    /// Raw value of a setting, `None` if it was never set
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrite a setting for the rest of the current request
    ///
    /// Hosts back this with their request-local configuration; the value
    /// must not be persisted. See [`RequestConfig`](crate::hooks::RequestConfig).
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Host truthiness: unset, empty and `"0"` are false
    fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| {
                let v = v.trim();
                !(v.is_empty() || v == "0")
            })
            .unwrap_or(false)
    }

    /// Leading integer of the value, 0 when there is none
    fn get_int(&self, key: &str) -> i64 {
        self.get(key).map(|v| parse_leading_int(&v)).unwrap_or(0)
    }

    /// Value with surrounding whitespace removed; empty and `"0"` count as unset
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !(v.is_empty() || v == "0"))
    }
}

/// Host administration log
pub trait LogStore: Send + Sync {
    fn add(
        &self,
        category: &str,
        user_id: UserId,
        ip: &str,
        message_key: &str,
        timestamp: DateTime<Utc>,
        metadata: &BTreeMap<String, Value>,
    ) -> anyhow::Result<()>;
}

/// Host mail facility
pub trait Mailer: Send + Sync {
    /// Start a new message
    fn compose(&self) -> Box<dyn OutgoingMail + '_>;
}

/// A message being assembled through the host messenger
pub trait OutgoingMail {
    fn set_template(&mut self, extension: &str, template_name: &str, locale: &str);

    fn to(&mut self, address: &str, display_name: &str);

    fn assign_vars(&mut self, vars: &BTreeMap<String, String>);

    fn send(self: Box<Self>) -> anyhow::Result<()>;
}

/// Host group membership lookup
pub trait GroupMembership: Send + Sync {
    /// True when the user belongs to at least one of the groups
    fn is_member_of_any(&self, group_ids: &BTreeSet<GroupId>, user_id: UserId) -> bool;
}

/// Ambient session of the current request
pub trait SessionUser: Send + Sync {
    fn current_user_id(&self) -> UserId;

    fn current_ip(&self) -> String;

    fn current_username(&self) -> String;
}

/// The collaborators a gateway is wired to
#[derive(Clone)]
pub struct Services {
    pub config: Arc<dyn ConfigStore>,
    pub log: Arc<dyn LogStore>,
    pub mailer: Arc<dyn Mailer>,
    pub groups: Arc<dyn GroupMembership>,
}

impl Services {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        log: Arc<dyn LogStore>,
        mailer: Arc<dyn Mailer>,
        groups: Arc<dyn GroupMembership>,
    ) -> Self {
        Self {
            config,
            log,
            mailer,
            groups,
        }
    }
}

/// Parse the leading integer of a host value (`"13 chars"` is 13, `"x"` is 0)
pub fn parse_leading_int(value: &str) -> i64 {
    let value = value.trim();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::MemoryConfigStore;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("13"), 13);
        assert_eq!(parse_leading_int(" 8 "), 8);
        assert_eq!(parse_leading_int("10chars"), 10);
        assert_eq!(parse_leading_int("-4"), -4);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int(""), 0);
    }

    #[test]
    fn test_config_store_typed_accessors() {
        let store = MemoryConfigStore::from_pairs([
            ("on", "1"),
            ("off", "0"),
            ("blank", "  "),
            ("count", "16"),
            ("contact", " security@example.com "),
        ]);

        assert!(store.get_bool("on"));
        assert!(!store.get_bool("off"));
        assert!(!store.get_bool("blank"));
        assert!(!store.get_bool("missing"));
        assert_eq!(store.get_int("count"), 16);
        assert_eq!(store.get_int("missing"), 0);
        assert_eq!(store.get_non_empty("contact").as_deref(), Some("security@example.com"));
        assert_eq!(store.get_non_empty("blank"), None);
        assert_eq!(store.get_non_empty("off"), None);
    }
}
