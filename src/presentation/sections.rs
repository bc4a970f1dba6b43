//! Section renderer registry.
//!
//! One template per registered section type. The match below is exhaustive
//! over [`Section`], so adding a variant without a renderer fails to compile.

use askama::Template;

use crate::application::page_builder::{RenderMode, SectionDispatch, dispatch_sections};
use crate::domain::sections::{
    CtaSection, FaqSection, FeatureGridSection, HeroSection, Section, SectionEntry,
};
use crate::presentation::portable_text::render_blocks;
use crate::presentation::views::TemplateRenderError;

const SOURCE: &str = "presentation::sections::render_sections";

#[derive(Template)]
#[template(path = "sections/hero.html")]
struct HeroTemplate<'a> {
    key: &'a str,
    section: &'a HeroSection,
}

#[derive(Template)]
#[template(path = "sections/cta.html")]
struct CtaTemplate<'a> {
    key: &'a str,
    section: &'a CtaSection,
}

#[derive(Template)]
#[template(path = "sections/feature_grid.html")]
struct FeatureGridTemplate<'a> {
    key: &'a str,
    section: &'a FeatureGridSection,
}

#[derive(Template)]
#[template(path = "sections/rich_text.html")]
struct RichTextTemplate<'a> {
    key: &'a str,
    heading: Option<&'a str>,
    body_html: String,
}

#[derive(Template)]
#[template(path = "sections/faq.html")]
struct FaqTemplate<'a> {
    key: &'a str,
    section: &'a FaqSection,
}

#[derive(Template)]
#[template(path = "sections/placeholder.html")]
struct PlaceholderTemplate<'a> {
    key: &'a str,
    type_name: &'a str,
    reason: Option<&'a str>,
}

/// Render a page's sections in authored order.
pub fn render_sections(
    entries: &[SectionEntry],
    mode: RenderMode,
) -> Result<Vec<String>, TemplateRenderError> {
    dispatch_sections(entries, mode)
        .iter()
        .map(render_dispatch)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TemplateRenderError::new(SOURCE, "Section rendering failed", err))
}

fn render_dispatch(dispatch: &SectionDispatch<'_>) -> Result<String, askama::Error> {
    match *dispatch {
        SectionDispatch::Render { key, section } => render_section(key, section),
        SectionDispatch::Placeholder {
            key,
            type_name,
            reason,
        } => PlaceholderTemplate {
            key,
            type_name,
            reason,
        }
        .render(),
    }
}

fn render_section(key: &str, section: &Section) -> Result<String, askama::Error> {
    match section {
        Section::Hero(section) => HeroTemplate { key, section }.render(),
        Section::Cta(section) => CtaTemplate { key, section }.render(),
        Section::FeatureGrid(section) => FeatureGridTemplate { key, section }.render(),
        Section::RichText(section) => RichTextTemplate {
            key,
            heading: section.heading.as_deref(),
            body_html: render_blocks(&section.body),
        }
        .render(),
        Section::Faq(section) => FaqTemplate { key, section }.render(),
        // Dispatch never hands these to a renderer.
        Section::Unknown { type_name } => PlaceholderTemplate {
            key,
            type_name,
            reason: None,
        }
        .render(),
        Section::Invalid { type_name, reason } => PlaceholderTemplate {
            key,
            type_name,
            reason: Some(reason),
        }
        .render(),
    }
}
