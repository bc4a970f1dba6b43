//! Page-builder sections.
//!
//! Each CMS section carries a `_type` tag naming its renderer and a `_key`
//! giving it a stable identity. Known tags map to one variant each; anything
//! else is kept as [`Section::Unknown`] (or [`Section::Invalid`] when a known
//! tag carries fields that do not fit) so the caller decides how loudly to fail.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::content::{Block, ImageRef};
use super::serde_util::{non_blank_string, null_as_default};

pub const HERO_SECTION: &str = "heroSection";
pub const CTA_SECTION: &str = "ctaSection";
pub const FEATURE_GRID_SECTION: &str = "featureGridSection";
pub const RICH_TEXT_SECTION: &str = "richTextSection";
pub const FAQ_SECTION: &str = "faqSection";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub heading: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub subheading: Option<String>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub cta_label: Option<String>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub cta_href: Option<String>,
    #[serde(default)]
    pub background_image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaSection {
    pub heading: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub body: Option<String>,
    pub button_label: String,
    pub button_href: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    pub title: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureGridSection {
    #[serde(default, deserialize_with = "non_blank_string")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichTextSection {
    #[serde(default, deserialize_with = "non_blank_string")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaqSection {
    #[serde(default, deserialize_with = "non_blank_string")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Hero(HeroSection),
    Cta(CtaSection),
    FeatureGrid(FeatureGridSection),
    RichText(RichTextSection),
    Faq(FaqSection),
    /// No renderer is registered for this tag.
    Unknown { type_name: String },
    /// A registered tag whose fields could not be read.
    Invalid { type_name: String, reason: String },
}

impl Section {
    pub fn type_name(&self) -> &str {
        match self {
            Section::Hero(_) => HERO_SECTION,
            Section::Cta(_) => CTA_SECTION,
            Section::FeatureGrid(_) => FEATURE_GRID_SECTION,
            Section::RichText(_) => RICH_TEXT_SECTION,
            Section::Faq(_) => FAQ_SECTION,
            Section::Unknown { type_name } | Section::Invalid { type_name, .. } => type_name,
        }
    }

    fn from_fields(type_name: &str, fields: Map<String, Value>) -> Self {
        let fields = Value::Object(fields);
        let parsed = match type_name {
            HERO_SECTION => serde_json::from_value(fields).map(Section::Hero),
            CTA_SECTION => serde_json::from_value(fields).map(Section::Cta),
            FEATURE_GRID_SECTION => serde_json::from_value(fields).map(Section::FeatureGrid),
            RICH_TEXT_SECTION => serde_json::from_value(fields).map(Section::RichText),
            FAQ_SECTION => serde_json::from_value(fields).map(Section::Faq),
            other => {
                return Section::Unknown {
                    type_name: other.to_string(),
                };
            }
        };

        parsed.unwrap_or_else(|err| Section::Invalid {
            type_name: type_name.to_string(),
            reason: err.to_string(),
        })
    }
}

/// One section of a page, in authored order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionEntry {
    pub key: String,
    pub section: Section,
}

impl SectionEntry {
    /// Split the tag and key off a raw CMS section; the remaining fields become
    /// the section's input. Sections without a key get one from their position.
    pub fn from_value(position: usize, value: Value) -> Self {
        let fallback_key = format!("section-{position}");

        let Value::Object(mut fields) = value else {
            return Self {
                key: fallback_key,
                section: Section::Invalid {
                    type_name: String::new(),
                    reason: "section is not an object".to_string(),
                },
            };
        };

        let key = take_string(&mut fields, "_key", "key").unwrap_or(fallback_key);
        let section = match take_string(&mut fields, "_type", "type") {
            Some(type_name) => Section::from_fields(&type_name, fields),
            None => Section::Invalid {
                type_name: String::new(),
                reason: "section has no type tag".to_string(),
            },
        };

        Self { key, section }
    }
}

pub fn parse_sections(values: &[Value]) -> Vec<SectionEntry> {
    values
        .iter()
        .cloned()
        .enumerate()
        .map(|(position, value)| SectionEntry::from_value(position, value))
        .collect()
}

fn take_string(fields: &mut Map<String, Value>, primary: &str, alias: &str) -> Option<String> {
    let value = fields.remove(primary).or_else(|| fields.remove(alias))?;
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}
