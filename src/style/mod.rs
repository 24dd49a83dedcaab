//! Style engine contract.
//!
//! The engine resolves an entity's tags into independently styled
//! subparts. Drawing items only ever see [`ResolvedStyle`] values.

mod rules;

pub use rules::{Condition, Rule, RuleKind, RuleSet, Selector};

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::data::{Node, Tags, Way};
use crate::surface::Color;

/// What the style engine is asked to style
#[derive(Debug, Clone, Copy)]
pub enum StyleTarget<'a> {
    Canvas,
    Node(&'a Node),
    Way(&'a Way),
}

/// A style property value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Value taken from the named tag at lookup time
    Tag { tag: String },
}

impl StyleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            StyleValue::Text(s) => s.trim().parse().ok(),
            StyleValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            StyleValue::Tag { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            StyleValue::Text(s) => Some(s.clone()),
            StyleValue::Number(n) => Some(n.to_string()),
            StyleValue::Bool(b) => Some(b.to_string()),
            StyleValue::Tag { .. } => None,
        }
    }

    /// Truthiness for flag-style properties (`font_bold`, `text_center`, ...)
    pub fn is_truthy(&self) -> bool {
        match self {
            StyleValue::Bool(b) => *b,
            StyleValue::Number(n) => *n != 0.0,
            StyleValue::Text(s) => !matches!(s.as_str(), "" | "no" | "false" | "0"),
            StyleValue::Tag { .. } => false,
        }
    }
}

/// A fully resolved style for one subpart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedStyle {
    pub sublayer: usize,
    pub properties: BTreeMap<String, StyleValue>,
}

impl ResolvedStyle {
    pub fn new(sublayer: usize) -> Self {
        Self {
            sublayer,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with(mut self, name: &str, value: StyleValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn defined(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Look up a property, resolving tag references against `tags`
    pub fn get(&self, tags: &Tags, name: &str) -> Option<StyleValue> {
        match self.properties.get(name)? {
            StyleValue::Tag { tag } => {
                let raw = tags.get(tag)?;
                Some(match raw.trim().parse::<f64>() {
                    Ok(n) => StyleValue::Number(n),
                    Err(_) => StyleValue::Text(raw.clone()),
                })
            }
            value => Some(value.clone()),
        }
    }

    pub fn number(&self, tags: &Tags, name: &str) -> Option<f64> {
        self.get(tags, name).and_then(|v| v.as_f64())
    }

    pub fn number_or(&self, tags: &Tags, name: &str, default: f64) -> f64 {
        self.number(tags, name).unwrap_or(default)
    }

    pub fn text(&self, tags: &Tags, name: &str) -> Option<String> {
        self.get(tags, name).and_then(|v| v.as_text())
    }

    pub fn flag(&self, tags: &Tags, name: &str) -> bool {
        self.get(tags, name).is_some_and(|v| v.is_truthy())
    }

    /// Colors are numeric RGB values, or hex strings such as `"#ff8800"`
    pub fn color_or(&self, tags: &Tags, name: &str, default: u32) -> Color {
        let rgb = match self.get(tags, name) {
            Some(StyleValue::Number(n)) => n as u32,
            Some(StyleValue::Text(s)) => {
                u32::from_str_radix(s.trim_start_matches('#'), 16).unwrap_or(default)
            }
            _ => default,
        };
        Color::from_rgb(rgb)
    }
}

/// One independently styled facet of an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subpart {
    pub name: String,
    pub shape: Option<ResolvedStyle>,
    pub text: Option<ResolvedStyle>,
    pub point: Option<ResolvedStyle>,
    pub layer_override: Option<i32>,
}

impl Subpart {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Ordered subparts for one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleList {
    pub subparts: Vec<Subpart>,
}

impl StyleList {
    pub fn is_empty(&self) -> bool {
        self.subparts.is_empty()
    }
}

/// Resolves an entity's tags into styled subparts at a scale
pub trait StyleEngine {
    fn styles_for(&self, target: StyleTarget<'_>, tags: &Tags, scale: f64) -> StyleList;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_reference_resolves_against_tags() {
        let style = ResolvedStyle::new(0)
            .with("text", StyleValue::Text("name".into()))
            .with("width", StyleValue::Tag { tag: "lanes".into() });
        let t = tags(&[("lanes", "3")]);
        assert_eq!(style.number(&t, "width"), Some(3.0));
        assert_eq!(style.text(&t, "text").as_deref(), Some("name"));
        assert_eq!(style.number(&Tags::new(), "width"), None);
    }

    #[test]
    fn test_color_parsing() {
        let style = ResolvedStyle::new(0)
            .with("color", StyleValue::Number(16711680.0))
            .with("fill_color", StyleValue::Text("#00ff80".into()));
        let t = Tags::new();
        assert_eq!(style.color_or(&t, "color", 0).to_hex(), "FF0000");
        assert_eq!(style.color_or(&t, "fill_color", 0).to_hex(), "00FF80");
        assert_eq!(style.color_or(&t, "casing_color", 0x123456).to_hex(), "123456");
    }

    #[test]
    fn test_flags() {
        let style = ResolvedStyle::new(0)
            .with("font_bold", StyleValue::Bool(true))
            .with("font_italic", StyleValue::Text("no".into()));
        let t = Tags::new();
        assert!(style.flag(&t, "font_bold"));
        assert!(!style.flag(&t, "font_italic"));
        assert!(!style.flag(&t, "font_caps"));
    }
}
