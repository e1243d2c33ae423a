//! Watch-group configuration and membership gating
//!
//! `sec_usergroups` holds the watched group ids the way the host stores
//! lists: a PHP-serialized array such as `a:2:{i:0;i:4;i:1;i:5;}`. JSON
//! arrays (`[4, 5]`) are accepted as well. Anything that fails to parse is
//! treated as "no groups", which leaves default host behaviour in place.

use std::collections::BTreeSet;

use nom::{
    branch::alt,
    bytes::complete::{tag, take},
    character::complete::{char, i64 as parse_i64, multispace0, u32 as parse_u32},
    combinator::{all_consuming, map, map_res},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde_json::Value;

use crate::hooks::{settings, ConfigStore, GroupId, GroupMembership, UserId};

/// The set of watched group ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchGroups(BTreeSet<GroupId>);

impl WatchGroups {
    pub fn new(ids: impl IntoIterator<Item = GroupId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Parse a stored value; unparseable input yields an empty set
    pub fn parse(raw: &str) -> Self {
        match Self::try_parse(raw) {
            Ok(groups) => groups,
            Err(reason) => {
                tracing::warn!(value = %raw, %reason, "Ignoring unparseable watch-group setting");
                Self::default()
            }
        }
    }

    /// Parse a stored value, reporting why it was rejected
    pub fn try_parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "0" {
            return Ok(Self::default());
        }

        if raw.starts_with('[') {
            return parse_json_list(raw).map(Self);
        }

        let (_, entries) = all_consuming(php_array)(raw).map_err(|e| format!("not a serialized array: {e}"))?;
        entries
            .into_iter()
            .map(|id| GroupId::try_from(id).map_err(|_| format!("invalid group id {id}")))
            .collect::<Result<_, _>>()
            .map(Self)
    }

    /// Read and parse `sec_usergroups`
    pub fn from_config(config: &dyn ConfigStore) -> Self {
        config
            .get(settings::SEC_USERGROUPS)
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub fn ids(&self) -> &BTreeSet<GroupId> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render in the host's serialized array format
    pub fn to_serialized(&self) -> String {
        let entries: String = self
            .0
            .iter()
            .enumerate()
            .map(|(index, id)| format!("i:{index};i:{id};"))
            .collect();
        format!("a:{}:{{{entries}}}", self.0.len())
    }
}

/// Whether the user belongs to any configured watch group
///
/// No configured groups means no one is watched; the membership lookup is
/// not consulted in that case.
pub fn in_watch_group(config: &dyn ConfigStore, groups: &dyn GroupMembership, user_id: UserId) -> bool {
    let watch_groups = WatchGroups::from_config(config);
    if watch_groups.is_empty() {
        return false;
    }
    groups.is_member_of_any(watch_groups.ids(), user_id)
}

fn parse_json_list(raw: &str) -> Result<BTreeSet<GroupId>, String> {
    let items: Vec<Value> = serde_json::from_str(raw).map_err(|e| format!("not a JSON list: {e}"))?;
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_u64().and_then(|id| GroupId::try_from(id).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| format!("invalid group id {item}")))
        .collect()
}

// a:<count>:{<key><value>...}
fn php_array(input: &str) -> IResult<&str, Vec<i64>> {
    let (rest, (count, entries)) = delimited(
        multispace0,
        pair(
            delimited(tag("a:"), parse_u32, tag(":{")),
            terminated(many0(preceded(php_key, php_numeric)), char('}')),
        ),
        multispace0,
    )(input)?;

    if count as usize != entries.len() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Count,
        )));
    }
    Ok((rest, entries))
}

fn php_key(input: &str) -> IResult<&str, ()> {
    alt((map(php_int, |_| ()), map(php_string, |_| ())))(input)
}

// Group ids arrive as ints or as numeric strings depending on the form
fn php_numeric(input: &str) -> IResult<&str, i64> {
    alt((php_int, map_res(php_string, |s: &str| s.trim().parse::<i64>())))(input)
}

// i:<n>;
fn php_int(input: &str) -> IResult<&str, i64> {
    delimited(tag("i:"), parse_i64, char(';'))(input)
}

// s:<len>:"<bytes>";
fn php_string(input: &str) -> IResult<&str, &str> {
    let (input, (_, len, _)) = tuple((tag("s:"), parse_u32, tag(":\"")))(input)?;
    terminated(take(len), tag("\";"))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{MemoryConfigStore, StaticGroupMembership};
    use tracing_test::traced_test;

    #[test]
    fn test_parse_php_int_array() {
        let groups = WatchGroups::parse("a:2:{i:0;i:4;i:1;i:5;}");
        assert_eq!(groups, WatchGroups::new([4, 5]));
    }

    #[test]
    fn test_parse_php_string_elements() {
        let groups = WatchGroups::parse(" a:2:{i:0;s:1:\"4\";i:1;s:2:\"12\";} \n");
        assert_eq!(groups, WatchGroups::new([4, 12]));
    }

    #[test]
    fn test_parse_json_list() {
        assert_eq!(WatchGroups::parse("[4, \"5\"]"), WatchGroups::new([4, 5]));
    }

    #[test]
    fn test_empty_and_falsy_values() {
        assert!(WatchGroups::parse("").is_empty());
        assert!(WatchGroups::parse("   ").is_empty());
        assert!(WatchGroups::parse("0").is_empty());
        assert!(WatchGroups::parse("a:0:{}").is_empty());
        assert!(WatchGroups::parse("[]").is_empty());
    }

    #[test]
    fn test_unparseable_values_are_empty() {
        for raw in [
            "a:2:{i:0;i:4;",
            "a:3:{i:0;i:4;i:1;i:5;}",
            "a:1:{i:0;i:-4;}",
            "a:1:{i:0;b:1;}",
            "4,5",
            "[4, null]",
            "O:8:\"stdClass\":0:{}",
        ] {
            assert!(WatchGroups::try_parse(raw).is_err(), "{raw} should be rejected");
            assert!(WatchGroups::parse(raw).is_empty());
        }
    }

    #[test]
    #[traced_test]
    fn test_unparseable_value_is_logged() {
        assert!(WatchGroups::parse("a:2:{i:0;i:4;").is_empty());
        assert!(logs_contain("Ignoring unparseable watch-group setting"));
    }

    #[test]
    fn test_serialized_round_trip() {
        let groups = WatchGroups::new([5, 4]);
        assert_eq!(groups.to_serialized(), "a:2:{i:0;i:4;i:1;i:5;}");
        assert_eq!(WatchGroups::parse(&groups.to_serialized()), groups);
    }

    #[test]
    fn test_in_watch_group() {
        let members = StaticGroupMembership::new().with_member(2, 5).with_member(3, 2);
        let config = MemoryConfigStore::from_pairs([(settings::SEC_USERGROUPS, "a:2:{i:0;i:4;i:1;i:5;}")]);

        assert!(in_watch_group(&config, &members, 2));
        assert!(!in_watch_group(&config, &members, 3));
        assert!(!in_watch_group(&config, &members, 99));
    }

    #[test]
    fn test_no_groups_configured_never_matches() {
        let members = StaticGroupMembership::new().with_member(2, 5);
        for config in [
            MemoryConfigStore::new(),
            MemoryConfigStore::from_pairs([(settings::SEC_USERGROUPS, "")]),
            MemoryConfigStore::from_pairs([(settings::SEC_USERGROUPS, "garbage")]),
        ] {
            assert!(!in_watch_group(&config, &members, 2));
        }
    }
}
