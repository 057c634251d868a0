// ============================================================================
// Rule key mapping - tslint key <-> host rule key
// ============================================================================
//
// KNOWN_RULES is the full table the engine bundle ships with. A run only
// ever sees a RuleKeyMapper built from the activated subset; every lookup
// outside that subset is an UnmappedRuleKey.
//
// The mapper also carries each activated rule's tslint options, which end up
// in the generated tslint.json.
// ============================================================================

use crate::error::{KeyDirection, UnmappedRuleKey};
use crate::host::{RuleKey, REPOSITORY_KEY};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;

/// (tslint key, host rule key)
pub const KNOWN_RULES: &[(&str, &str)] = &[
    // tslint core rules
    ("max-line-length", "S103"),
    ("max-file-line-count", "S104"),
    ("no-magic-numbers", "S109"),
    // tslint-sonarts rules
    ("no-all-duplicated-branches", "S3923"),
    ("no-collection-size-mischeck", "S3981"),
    ("no-empty-destructuring", "S3799"),
    ("no-identical-conditions", "S1862"),
    ("no-identical-expressions", "S1764"),
    ("no-ignored-return", "S2201"),
    ("no-inconsistent-return", "S3801"),
    ("no-misspelled-operator", "S2757"),
    ("no-self-assignment", "S1656"),
    ("no-unconditional-jump", "S1751"),
    ("no-useless-increment", "S2123"),
    ("no-use-of-empty-return-value", "S3699"),
    ("no-variable-usage-before-declaration", "S1526"),
];

/// Host keys of the default "Sonar way" profile
pub const SONAR_WAY: &[&str] = &["S1751", "S1764", "S2201"];

static HOST_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^S\d+$").unwrap());

/// Whether `key` looks like a host rule key (`S1751`).
pub fn is_host_key(key: &str) -> bool {
    HOST_KEY_PATTERN.is_match(key)
}

/// Every host key of the known table, in table order.
pub fn all_host_keys() -> Vec<String> {
    KNOWN_RULES.iter().map(|(_, h)| h.to_string()).collect()
}

/// Host keys of the default profile.
pub fn sonar_way_keys() -> Vec<String> {
    SONAR_WAY.iter().map(|k| k.to_string()).collect()
}

/// tslint options of a rule the host sets no parameters for.
pub fn default_configuration(external: &str) -> Value {
    match external {
        "max-line-length" => json!([true, 180]),
        "max-file-line-count" => json!([true, 1000]),
        "no-magic-numbers" => json!([true, -1, 0, 1]),
        _ => Value::Bool(true),
    }
}

/// Immutable bidirectional table over the activated rules.
#[derive(Debug, Clone)]
pub struct RuleKeyMapper {
    to_host: HashMap<String, String>,
    to_external: HashMap<String, String>,
    /// tslint key -> options set by the host
    parameters: HashMap<String, Value>,
}

impl RuleKeyMapper {
    /// Build from the host keys the host has activated.
    ///
    /// An activated key the bundle does not know is a configuration mismatch
    /// and fails immediately.
    pub fn from_active_rules<I, S>(active: I) -> Result<Self, UnmappedRuleKey>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut to_host = HashMap::new();
        let mut to_external = HashMap::new();
        for key in active {
            let key = key.as_ref();
            let (external, host) = KNOWN_RULES
                .iter()
                .find(|(_, h)| *h == key)
                .ok_or_else(|| UnmappedRuleKey {
                    direction: KeyDirection::ToExternal,
                    key: key.to_string(),
                })?;
            to_host.insert(external.to_string(), host.to_string());
            to_external.insert(host.to_string(), external.to_string());
        }
        Ok(Self {
            to_host,
            to_external,
            parameters: HashMap::new(),
        })
    }

    /// Mapper over the whole known table.
    pub fn all() -> Self {
        let to_host = KNOWN_RULES
            .iter()
            .map(|(e, h)| (e.to_string(), h.to_string()))
            .collect();
        let to_external = KNOWN_RULES
            .iter()
            .map(|(e, h)| (h.to_string(), e.to_string()))
            .collect();
        Self {
            to_host,
            to_external,
            parameters: HashMap::new(),
        }
    }

    /// Set the tslint options of an activated rule. A bare value such as
    /// `120` becomes `[true, 120]`; booleans and arrays are taken as is.
    pub fn with_parameters(mut self, host: &str, value: Value) -> Result<Self, UnmappedRuleKey> {
        let external = self
            .to_external
            .get(host)
            .cloned()
            .ok_or_else(|| UnmappedRuleKey {
                direction: KeyDirection::ToExternal,
                key: host.to_string(),
            })?;
        let value = match value {
            Value::Bool(_) | Value::Array(_) => value,
            other => json!([true, other]),
        };
        self.parameters.insert(external, value);
        Ok(self)
    }

    /// Options written to tslint.json for an activated tslint key.
    pub fn configuration(&self, external: &str) -> Value {
        self.parameters
            .get(external)
            .cloned()
            .unwrap_or_else(|| default_configuration(external))
    }

    pub fn to_host_key(&self, external: &str) -> Result<RuleKey, UnmappedRuleKey> {
        self.to_host
            .get(external)
            .map(|h| RuleKey::of(REPOSITORY_KEY, h))
            .ok_or_else(|| UnmappedRuleKey {
                direction: KeyDirection::ToHost,
                key: external.to_string(),
            })
    }

    pub fn to_external_key(&self, host: &RuleKey) -> Result<&str, UnmappedRuleKey> {
        let miss = || UnmappedRuleKey {
            direction: KeyDirection::ToExternal,
            key: host.to_string(),
        };
        if host.repository != REPOSITORY_KEY {
            return Err(miss());
        }
        self.to_external.get(&host.rule).map(String::as_str).ok_or_else(miss)
    }

    /// Activated tslint keys, sorted.
    pub fn external_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.to_host.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.to_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_host.is_empty()
    }
}
