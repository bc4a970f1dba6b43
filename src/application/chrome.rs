use crate::application::content::{ContentService, Fetched};
use crate::domain::content::{NavLink, SiteSettings};
use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
    SocialLinkView,
};

const DEFAULT_DESCRIPTION: &str =
    "News, guides and tools for the miners of The Howling Mine community.";

/// Builds the shared layout chrome from the site-settings singleton, falling
/// back to static defaults when the CMS has none.
#[derive(Clone)]
pub struct ChromeService {
    content: ContentService,
    default_title: String,
}

impl ChromeService {
    pub fn new(content: ContentService, default_title: impl Into<String>) -> Self {
        Self {
            content,
            default_title: default_title.into(),
        }
    }

    pub async fn load(&self) -> Fetched<LayoutChrome> {
        self.content
            .site_settings()
            .await
            .map(|settings| build_chrome(&settings, &self.default_title))
    }
}

pub fn build_chrome(settings: &SiteSettings, default_title: &str) -> LayoutChrome {
    let title = settings
        .title
        .clone()
        .unwrap_or_else(|| default_title.to_string());
    let description = settings
        .description
        .clone()
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let entries = if settings.navigation.is_empty() {
        default_navigation()
    } else {
        settings.navigation.iter().map(map_nav_link).collect()
    };

    let social = settings
        .social_links
        .iter()
        .map(|link| SocialLinkView {
            label: link.platform.clone(),
            href: link.url.clone(),
        })
        .collect();

    LayoutChrome {
        brand: BrandView {
            title: title.clone(),
            href: "/".to_string(),
        },
        navigation: NavigationView { entries },
        footer: FooterView {
            copy: settings
                .footer_text
                .clone()
                .unwrap_or_else(|| format!("© {title}")),
            social,
        },
        meta: PageMetaView {
            title,
            description,
        },
    }
}

fn default_navigation() -> Vec<NavigationLinkView> {
    [("News", "/news"), ("Guides", "/guides")]
        .into_iter()
        .map(|(label, href)| NavigationLinkView {
            label: label.to_string(),
            href: href.to_string(),
            external: false,
        })
        .collect()
}

fn map_nav_link(link: &NavLink) -> NavigationLinkView {
    let external = link.href.starts_with("http://") || link.href.starts_with("https://");
    NavigationLinkView {
        label: link.label.clone(),
        href: link.href.clone(),
        external,
    }
}
