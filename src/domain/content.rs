//! Content records as delivered by the CMS query layer.
//!
//! Field names follow the CMS projections (camelCase, `_id`). Every optional
//! field tolerates both a missing key and an explicit `null`.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::serde_util::{non_blank_string, null_as_default};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
}

/// A category reference as the CMS projects it. A dangling reference arrives
/// as `null` and a category without a title as `{"title": null}`; neither
/// reaches the hubs.
#[derive(Deserialize)]
struct ProjectedCategory {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: Option<String>,
}

impl ProjectedCategory {
    fn resolve(self) -> Option<CategoryRef> {
        let title = self.title.filter(|title| !title.trim().is_empty())?;
        Some(CategoryRef {
            title,
            slug: self.slug.unwrap_or_default(),
        })
    }
}

fn resolved_categories<'de, D>(deserializer: D) -> Result<Vec<CategoryRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let projected = Option::<Vec<Option<ProjectedCategory>>>::deserialize(deserializer)?;
    Ok(projected
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(ProjectedCategory::resolve)
        .collect())
}

fn resolved_category<'de, D>(deserializer: D) -> Result<Option<CategoryRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ProjectedCategory>::deserialize(deserializer)?.and_then(ProjectedCategory::resolve))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub name: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Display order, easiest first.
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str() == value)
    }
}

/// Unrecognised tags are dropped instead of failing the whole listing.
fn lenient_difficulty<'de, D>(deserializer: D) -> Result<Option<Difficulty>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(Difficulty::parse))
}

/// A news post as returned by the listing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub excerpt: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default, deserialize_with = "resolved_categories")]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub cover_image: Option<ImageRef>,
    #[serde(default)]
    pub author: Option<AuthorRef>,
}

impl PostRecord {
    pub fn category_titles(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.title.as_str())
    }

    /// Undated records sort as though published at the epoch.
    pub fn sort_date(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// A guide as returned by the listing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub excerpt: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "resolved_category")]
    pub category: Option<CategoryRef>,
    #[serde(default, deserialize_with = "lenient_difficulty")]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub cover_image: Option<ImageRef>,
}

impl GuideRecord {
    pub fn category_title(&self) -> Option<&str> {
        self.category.as_ref().map(|category| category.title.as_str())
    }

    pub fn sort_date(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Manual ordering key; guides without one sit at zero.
    pub fn sort_order(&self) -> i64 {
        self.order.unwrap_or(0)
    }
}

/// One span of inline text inside a portable-text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub marks: Vec<String>,
}

/// An annotation referenced from a span's `marks` by key; links carry `href`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub href: Option<String>,
}

/// A portable-text block. Only text blocks carry renderable children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub style: Option<String>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub list_item: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Span>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mark_defs: Vec<MarkDef>,
}

impl Block {
    pub fn is_text(&self) -> bool {
        self.kind == "block"
    }

    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
        self.mark_defs.iter().find(|def| def.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostRecord,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideDetail {
    #[serde(flatten)]
    pub guide: GuideRecord,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<Block>,
}

/// A page-builder document. Sections stay raw until dispatch so one bad
/// section never fails the whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// The site-wide settings singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    #[serde(default, deserialize_with = "non_blank_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub navigation: Vec<NavLink>,
    #[serde(default, deserialize_with = "non_blank_string")]
    pub footer_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub social_links: Vec<SocialLink>,
}
