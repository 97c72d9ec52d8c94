/// Configuration store: group definitions, pattern rules, settings, and the
/// persisted blob for the extension's key-value storage
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::matcher::{PatternKind, matches_pattern};

pub const KEY_GROUP_DEFINITIONS: &str = "groupDefinitions";
pub const KEY_PATTERN_RULES: &str = "patternRules";
pub const KEY_IS_ENABLED: &str = "isEnabled";
pub const KEY_IGNORE_PINNED_TABS: &str = "ignorePinnedTabs";
pub const KEY_TAB_PLACEMENT: &str = "tabPlacement";

/// Every key the store persists; loaded together at startup, written
/// together on every mutation.
pub const STORAGE_KEYS: [&str; 5] = [
    KEY_GROUP_DEFINITIONS,
    KEY_PATTERN_RULES,
    KEY_IS_ENABLED,
    KEY_IGNORE_PINNED_TABS,
    KEY_TAB_PLACEMENT,
];

/// The predefined palette the host tab-group API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [GroupColor; 9] = [
        GroupColor::Grey,
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
        GroupColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }
}

/// A user-configured abstract group: a name and a color, independent of any
/// live browser state. Identity is the map key it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    pub color: GroupColor,
}

/// Maps a URL pattern to a group definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    pub pattern: String,
    pub group_id: String,
    pub kind: PatternKind,
}

/// Where a tab lands inside its target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabPlacement {
    First,
    Last,
}

impl TabPlacement {
    pub fn parse(value: &str) -> Option<TabPlacement> {
        match value {
            "first" => Some(TabPlacement::First),
            "last" => Some(TabPlacement::Last),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabPlacement::First => "first",
            TabPlacement::Last => "last",
        }
    }
}

/// Process-wide behavior toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub ignore_pinned_tabs: bool,
    pub tab_placement: TabPlacement,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: true,
            ignore_pinned_tabs: false,
            tab_placement: TabPlacement::Last,
        }
    }
}

/// In-memory configuration: group definitions keyed by groupId, pattern
/// rules as an ordered sequence. Rule order is first-match-wins; pattern
/// uniqueness is an invariant enforced on insert, not a property of the
/// container.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    pub groups: IndexMap<String, GroupDefinition>,
    rules: Vec<PatternRule>,
    pub settings: Settings,
}

impl ConfigStore {
    pub fn new() -> Self {
        ConfigStore::default()
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn group(&self, group_id: &str) -> Option<&GroupDefinition> {
        self.groups.get(group_id)
    }

    pub fn has_rule(&self, pattern: &str) -> bool {
        self.rules.iter().any(|rule| rule.pattern == pattern)
    }

    /// First rule claiming `url`, in insertion order.
    pub fn first_match(&self, url: &str) -> Option<&PatternRule> {
        self.rules
            .iter()
            .find(|rule| matches_pattern(url, &rule.pattern, rule.kind))
    }

    pub fn upsert_group(&mut self, group_id: String, definition: GroupDefinition) {
        self.groups.insert(group_id, definition);
    }

    /// Remove a group definition together with every rule referencing it,
    /// so no rule is ever left dangling. Returns the removed definition and
    /// rules, or None if the groupId was unknown.
    pub fn remove_group_cascade(
        &mut self,
        group_id: &str,
    ) -> Option<(GroupDefinition, Vec<PatternRule>)> {
        let definition = self.groups.shift_remove(group_id)?;
        let (dropped, kept) = self
            .rules
            .drain(..)
            .partition(|rule| rule.group_id == group_id);
        self.rules = kept;
        Some((definition, dropped))
    }

    /// Insert a rule, or replace the existing rule for the same pattern
    /// text in place. Replacing keeps the rule's first-match position.
    pub fn upsert_rule(&mut self, rule: PatternRule) {
        match self.rules.iter_mut().find(|r| r.pattern == rule.pattern) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn remove_rule(&mut self, pattern: &str) -> Option<PatternRule> {
        let position = self.rules.iter().position(|rule| rule.pattern == pattern)?;
        Some(self.rules.remove(position))
    }

    /// Re-key the rule at `old_pattern` in place, keeping its position.
    /// Returns false if no rule has `old_pattern`. Collision with another
    /// rule's pattern is the caller's invariant to check first.
    pub fn replace_rule(&mut self, old_pattern: &str, rule: PatternRule) -> bool {
        match self.rules.iter_mut().find(|r| r.pattern == old_pattern) {
            Some(existing) => {
                *existing = rule;
                true
            }
            None => false,
        }
    }

    /// Serialize to the persisted key-value layout. Rules are written as a
    /// pattern-keyed object; insertion order carries through IndexMap.
    pub fn to_blob(&self) -> Value {
        let rules: IndexMap<&str, StoredRule> = self
            .rules
            .iter()
            .map(|rule| {
                (
                    rule.pattern.as_str(),
                    StoredRule {
                        group_id: rule.group_id.clone(),
                        kind: rule.kind,
                    },
                )
            })
            .collect();

        json!({
            KEY_GROUP_DEFINITIONS: self.groups,
            KEY_PATTERN_RULES: rules,
            KEY_IS_ENABLED: self.settings.enabled,
            KEY_IGNORE_PINNED_TABS: self.settings.ignore_pinned_tabs,
            KEY_TAB_PLACEMENT: self.settings.tab_placement,
        })
    }

    /// Load from the persisted layout. Missing keys fall back to defaults;
    /// an unreadable section is discarded with a log line rather than
    /// failing the whole load.
    pub fn from_blob(blob: &Value) -> Self {
        let mut store = ConfigStore::default();

        if let Some(raw) = blob.get(KEY_GROUP_DEFINITIONS) {
            match serde_json::from_value::<IndexMap<String, GroupDefinition>>(raw.clone()) {
                Ok(groups) => store.groups = groups,
                Err(e) => log::error!("discarding unreadable group definitions: {e}"),
            }
        }

        if let Some(raw) = blob.get(KEY_PATTERN_RULES) {
            match serde_json::from_value::<IndexMap<String, StoredRuleRepr>>(raw.clone()) {
                Ok(rules) => {
                    store.rules = rules
                        .into_iter()
                        .map(|(pattern, stored)| {
                            let StoredRule { group_id, kind } = stored.into();
                            PatternRule {
                                pattern,
                                group_id,
                                kind,
                            }
                        })
                        .collect();
                }
                Err(e) => log::error!("discarding unreadable pattern rules: {e}"),
            }
        }

        if let Some(enabled) = blob.get(KEY_IS_ENABLED).and_then(Value::as_bool) {
            store.settings.enabled = enabled;
        }
        if let Some(ignore) = blob.get(KEY_IGNORE_PINNED_TABS).and_then(Value::as_bool) {
            store.settings.ignore_pinned_tabs = ignore;
        }
        if let Some(raw) = blob.get(KEY_TAB_PLACEMENT) {
            match serde_json::from_value::<TabPlacement>(raw.clone()) {
                Ok(placement) => store.settings.tab_placement = placement,
                Err(_) => log::warn!("ignoring unrecognized tabPlacement {raw}"),
            }
        }

        store
    }
}

/// Stored form of a rule's value under its pattern key.
#[derive(Debug, Serialize)]
struct StoredRule {
    #[serde(rename = "groupId")]
    group_id: String,
    kind: PatternKind,
}

/// Stored rule values come in two encodings: the current object form and a
/// legacy bare groupId string, which loads as a simple rule.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRuleRepr {
    Full {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(default)]
        kind: PatternKind,
    },
    Legacy(String),
}

impl From<StoredRuleRepr> for StoredRule {
    fn from(repr: StoredRuleRepr) -> Self {
        match repr {
            StoredRuleRepr::Full { group_id, kind } => StoredRule { group_id, kind },
            StoredRuleRepr::Legacy(group_id) => StoredRule {
                group_id,
                kind: PatternKind::Simple,
            },
        }
    }
}
