use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{ResolvedStyle, StyleEngine, StyleList, StyleTarget, StyleValue, Subpart};
use crate::data::Tags;

/// Which entities a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    Canvas,
    Node,
    Way,
    /// Closed ways (carrying the `:area` state)
    Area,
    #[serde(rename = "*")]
    Any,
}

impl Selector {
    fn matches(self, target: &StyleTarget<'_>, tags: &Tags) -> bool {
        match (self, target) {
            (Selector::Any, _) => true,
            (Selector::Canvas, StyleTarget::Canvas) => true,
            (Selector::Node, StyleTarget::Node(_)) => true,
            (Selector::Way, StyleTarget::Way(_)) => true,
            (Selector::Area, StyleTarget::Way(_)) => tags.contains_key(":area"),
            _ => false,
        }
    }
}

/// Tag test. `"*"` means present, `"!"` absent, anything else exact match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Condition {
    Present,
    Absent,
    Equals(String),
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "*" => Condition::Present,
            "!" => Condition::Absent,
            _ => Condition::Equals(value),
        }
    }
}

impl Condition {
    fn matches(&self, value: Option<&String>) -> bool {
        match self {
            Condition::Present => value.is_some(),
            Condition::Absent => value.is_none(),
            Condition::Equals(expected) => value == Some(expected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Shape,
    Text,
    Point,
}

fn default_subpart() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rule {
    pub selector: Selector,
    #[serde(default)]
    pub conditions: BTreeMap<String, Condition>,
    #[serde(default)]
    pub min_scale: Option<f64>,
    #[serde(default)]
    pub max_scale: Option<f64>,
    #[serde(default = "default_subpart")]
    pub subpart: String,
    #[serde(default)]
    pub kind: RuleKind,
    #[serde(default)]
    pub sublayer: Option<usize>,
    #[serde(default)]
    pub layer: Option<i32>,
    #[serde(default)]
    pub properties: BTreeMap<String, StyleValue>,
}

impl Rule {
    fn matches(&self, target: &StyleTarget<'_>, tags: &Tags, scale: f64) -> bool {
        self.selector.matches(target, tags)
            && self.min_scale.map_or(true, |min| scale >= min)
            && self.max_scale.map_or(true, |max| scale <= max)
            && self
                .conditions
                .iter()
                .all(|(key, cond)| cond.matches(tags.get(key)))
    }
}

/// Flat, ordered rule table.
///
/// Every matching rule contributes its properties to the (subpart, kind)
/// it names; later rules override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON rule table
    pub fn from_json(bytes: &mut [u8]) -> Result<Self> {
        simd_json::serde::from_slice(bytes).context("parsing style rules")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&mut bytes).with_context(|| format!("in {}", path.display()))
    }
}

impl StyleEngine for RuleSet {
    fn styles_for(&self, target: StyleTarget<'_>, tags: &Tags, scale: f64) -> StyleList {
        let mut list = StyleList::default();

        for rule in self.rules.iter().filter(|r| r.matches(&target, tags, scale)) {
            let index = match list.subparts.iter().position(|s| s.name == rule.subpart) {
                Some(i) => i,
                None => {
                    list.subparts.push(Subpart::named(&rule.subpart));
                    list.subparts.len() - 1
                }
            };
            let subpart = &mut list.subparts[index];
            if rule.layer.is_some() {
                subpart.layer_override = rule.layer;
            }

            let slot = match rule.kind {
                RuleKind::Shape => &mut subpart.shape,
                RuleKind::Text => &mut subpart.text,
                RuleKind::Point => &mut subpart.point,
            };
            let style = slot.get_or_insert_with(ResolvedStyle::default);
            if let Some(sublayer) = rule.sublayer {
                style.sublayer = sublayer;
            }
            for (name, value) in &rule.properties {
                style.properties.insert(name.clone(), value.clone());
            }
        }

        list
    }
}
