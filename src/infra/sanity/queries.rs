//! GROQ projections. Field names match the serde shapes in `domain::content`.

const POST_FIELDS: &str = r#"_id,
  title,
  "slug": slug.current,
  excerpt,
  publishedAt,
  featured,
  "categories": categories[]->{ title, "slug": slug.current }[defined(title)],
  coverImage{ "url": asset->url, alt },
  "author": author->{ name, "slug": slug.current }"#;

const GUIDE_FIELDS: &str = r#"_id,
  title,
  "slug": slug.current,
  excerpt,
  publishedAt,
  "category": select(defined(category->title) => category->{ title, "slug": slug.current }),
  difficulty,
  order,
  coverImage{ "url": asset->url, alt }"#;

pub fn all_posts() -> String {
    format!(
        r#"*[_type == "post" && defined(slug.current) && publishedAt <= now()] | order(publishedAt desc) {{ {POST_FIELDS} }}"#
    )
}

pub fn post_by_slug() -> String {
    format!(r#"*[_type == "post" && slug.current == $slug][0] {{ {POST_FIELDS}, body }}"#)
}

pub fn all_guides() -> String {
    format!(
        r#"*[_type == "guide" && defined(slug.current)] | order(order asc, title asc) {{ {GUIDE_FIELDS} }}"#
    )
}

pub fn guide_by_slug() -> String {
    format!(r#"*[_type == "guide" && slug.current == $slug][0] {{ {GUIDE_FIELDS}, body }}"#)
}

pub const PAGE_BY_SLUG: &str = r#"*[_type == "page" && slug.current == $slug][0] {
  _id,
  title,
  "slug": slug.current,
  sections[]{ ..., "backgroundImage": backgroundImage{ "url": asset->url, alt } }
}"#;

pub const SLUGS_BY_TYPE: &str =
    r#"*[_type == $type && defined(slug.current)].slug.current"#;

pub const SITE_SETTINGS: &str = r#"*[_type == "siteSettings"][0] {
  title,
  description,
  navigation[]{ label, href },
  footerText,
  socialLinks[]{ platform, url }
}"#;
