//! In-memory collaborators
//!
//! Useful for hosts that keep settings in process and for exercising the
//! gateway without a forum behind it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::{
    ConfigStore, GroupId, GroupMembership, LogStore, Mailer, OutgoingMail, SessionUser, UserId,
};

/// Settings held in a map
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Copy of every setting
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .write()
            .map_err(|_| anyhow!("config store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Request-local view of a host store
///
/// Reads fall through to the base store; writes stay in the overlay and are
/// dropped with it.
pub struct RequestConfig {
    base: Arc<dyn ConfigStore>,
    overrides: RwLock<BTreeMap<String, String>>,
}

impl RequestConfig {
    pub fn new(base: Arc<dyn ConfigStore>) -> Self {
        Self {
            base,
            overrides: RwLock::new(BTreeMap::new()),
        }
    }

    /// Settings changed during this request
    pub fn overrides(&self) -> BTreeMap<String, String> {
        self.overrides
            .read()
            .map(|overrides| overrides.clone())
            .unwrap_or_default()
    }
}

impl ConfigStore for RequestConfig {
    fn get(&self, key: &str) -> Option<String> {
        let overridden = self.overrides.read().ok()?.get(key).cloned();
        overridden.or_else(|| self.base.get(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.overrides
            .write()
            .map_err(|_| anyhow!("request config lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One entry written to a log store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub category: String,
    pub user_id: UserId,
    pub ip: String,
    pub message_key: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
}

/// Append-only log kept in memory
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl LogStore for MemoryLogStore {
    fn add(
        &self,
        category: &str,
        user_id: UserId,
        ip: &str,
        message_key: &str,
        timestamp: DateTime<Utc>,
        metadata: &BTreeMap<String, Value>,
    ) -> anyhow::Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("log store lock poisoned"))?
            .push(LogRecord {
                category: category.to_string(),
                user_id,
                ip: ip.to_string(),
                message_key: message_key.to_string(),
                timestamp,
                metadata: metadata.clone(),
            });
        Ok(())
    }
}

/// A message handed to the mailer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMail {
    pub extension: String,
    pub template: String,
    pub locale: String,
    pub to_address: String,
    pub to_name: String,
    pub vars: BTreeMap<String, String>,
}

/// Mailer that keeps every sent message instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose transport rejects every message
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn compose(&self) -> Box<dyn OutgoingMail + '_> {
        Box::new(RecordedMessage {
            mailer: self,
            mail: SentMail::default(),
        })
    }
}

struct RecordedMessage<'a> {
    mailer: &'a RecordingMailer,
    mail: SentMail,
}

impl OutgoingMail for RecordedMessage<'_> {
    fn set_template(&mut self, extension: &str, template_name: &str, locale: &str) {
        self.mail.extension = extension.to_string();
        self.mail.template = template_name.to_string();
        self.mail.locale = locale.to_string();
    }

    fn to(&mut self, address: &str, display_name: &str) {
        self.mail.to_address = address.to_string();
        self.mail.to_name = display_name.to_string();
    }

    fn assign_vars(&mut self, vars: &BTreeMap<String, String>) {
        self.mail
            .vars
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn send(self: Box<Self>) -> anyhow::Result<()> {
        if let Some(reason) = &self.mailer.failure {
            return Err(anyhow!("{reason}"));
        }
        self.mailer
            .sent
            .lock()
            .map_err(|_| anyhow!("mailer lock poisoned"))?
            .push(self.mail);
        Ok(())
    }
}

/// Fixed user to group assignments
#[derive(Debug, Default, Clone)]
pub struct StaticGroupMembership {
    memberships: HashMap<UserId, BTreeSet<GroupId>>,
}

impl StaticGroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, user_id: UserId, group_id: GroupId) -> Self {
        self.memberships.entry(user_id).or_default().insert(group_id);
        self
    }
}

impl GroupMembership for StaticGroupMembership {
    fn is_member_of_any(&self, group_ids: &BTreeSet<GroupId>, user_id: UserId) -> bool {
        self.memberships
            .get(&user_id)
            .is_some_and(|groups| !groups.is_disjoint(group_ids))
    }
}

/// A session that never changes
#[derive(Debug, Clone)]
pub struct StaticSession {
    user_id: UserId,
    ip: String,
    username: String,
}

impl StaticSession {
    pub fn new(user_id: UserId, ip: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id,
            ip: ip.into(),
            username: username.into(),
        }
    }
}

impl SessionUser for StaticSession {
    fn current_user_id(&self) -> UserId {
        self.user_id
    }

    fn current_ip(&self) -> String {
        self.ip.clone()
    }

    fn current_username(&self) -> String {
        self.username.clone()
    }
}
