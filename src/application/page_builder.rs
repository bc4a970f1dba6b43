//! Decides what each page-builder section turns into.
//!
//! Registered sections render; unregistered or unreadable ones become a
//! visible placeholder in development and disappear in production. Output
//! order always matches authored order.

use tracing::warn;

use crate::domain::sections::{Section, SectionEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    Development,
    #[default]
    Production,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Development => "development",
            RenderMode::Production => "production",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RenderMode::Development),
            "production" | "prod" => Some(RenderMode::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionDispatch<'a> {
    Render {
        key: &'a str,
        section: &'a Section,
    },
    Placeholder {
        key: &'a str,
        type_name: &'a str,
        reason: Option<&'a str>,
    },
}

impl SectionDispatch<'_> {
    pub fn key(&self) -> &str {
        match self {
            SectionDispatch::Render { key, .. } | SectionDispatch::Placeholder { key, .. } => key,
        }
    }
}

pub fn dispatch_sections(entries: &[SectionEntry], mode: RenderMode) -> Vec<SectionDispatch<'_>> {
    entries
        .iter()
        .filter_map(|entry| dispatch_one(entry, mode))
        .collect()
}

fn dispatch_one(entry: &SectionEntry, mode: RenderMode) -> Option<SectionDispatch<'_>> {
    let reason = match &entry.section {
        Section::Unknown { .. } => None,
        Section::Invalid { reason, .. } => Some(reason.as_str()),
        section => {
            return Some(SectionDispatch::Render {
                key: &entry.key,
                section,
            });
        }
    };

    let type_name = entry.section.type_name();
    match mode {
        RenderMode::Development => Some(SectionDispatch::Placeholder {
            key: &entry.key,
            type_name,
            reason,
        }),
        RenderMode::Production => {
            warn!(
                target = "howling_mine::page_builder",
                key = %entry.key,
                section_type = type_name,
                reason = reason.unwrap_or("no renderer registered"),
                "skipping section"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sections::parse_sections;
    use serde_json::json;

    fn sample() -> Vec<SectionEntry> {
        parse_sections(&[
            json!({"_type": "heroSection", "_key": "hero", "heading": "Welcome"}),
            json!({"_type": "unknownType", "_key": "mystery"}),
            json!({"_type": "ctaSection", "_key": "cta", "heading": "Join", "buttonLabel": "Go", "buttonHref": "/join"}),
        ])
    }

    #[test]
    fn development_keeps_a_placeholder_in_place() {
        let entries = sample();
        let dispatched = dispatch_sections(&entries, RenderMode::Development);

        let keys: Vec<&str> = dispatched.iter().map(SectionDispatch::key).collect();
        assert_eq!(keys, vec!["hero", "mystery", "cta"]);
        assert!(matches!(
            dispatched[1],
            SectionDispatch::Placeholder { type_name: "unknownType", reason: None, .. }
        ));
    }

    #[test]
    fn production_drops_unknown_sections() {
        let entries = sample();
        let dispatched = dispatch_sections(&entries, RenderMode::Production);

        let keys: Vec<&str> = dispatched.iter().map(SectionDispatch::key).collect();
        assert_eq!(keys, vec!["hero", "cta"]);
    }

    #[test]
    fn empty_sections_render_nothing() {
        assert!(dispatch_sections(&[], RenderMode::Development).is_empty());
    }

    #[test]
    fn parses_render_mode_aliases() {
        assert_eq!(RenderMode::parse("Dev"), Some(RenderMode::Development));
        assert_eq!(RenderMode::parse("production"), Some(RenderMode::Production));
        assert_eq!(RenderMode::parse("staging"), None);
    }
}
