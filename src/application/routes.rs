use std::collections::BTreeSet;

use crate::application::content::ContentService;
use crate::application::repos::{DocumentKind, SourceError};

/// Slug of the page-builder document rendered at `/`.
pub const HOME_SLUG: &str = "home";

const STATIC_ROUTES: [&str; 3] = ["/", "/news", "/guides"];

/// Every public HTML route, sorted and de-duplicated.
pub async fn enumerate_routes(content: &ContentService) -> Result<Vec<String>, SourceError> {
    let mut routes: BTreeSet<String> = STATIC_ROUTES.iter().map(|route| route.to_string()).collect();

    for kind in DocumentKind::ALL {
        let slugs = content.slugs(kind).await?;
        routes.extend(
            slugs
                .iter()
                .map(|slug| slug.trim())
                .filter(|slug| !slug.is_empty())
                .filter_map(|slug| route_for(kind, slug)),
        );
    }

    Ok(routes.into_iter().collect())
}

pub fn route_for(kind: DocumentKind, slug: &str) -> Option<String> {
    match kind {
        DocumentKind::Post => Some(format!("/news/{slug}")),
        DocumentKind::Guide => Some(format!("/guides/{slug}")),
        DocumentKind::Page if slug == HOME_SLUG => None,
        DocumentKind::Page => Some(format!("/{slug}")),
    }
}
