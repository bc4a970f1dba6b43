//! On-demand revalidation webhook.
//!
//! The CMS signs each notification with HMAC-SHA256 over `"<t>.<body>"` and
//! sends `t=<timestamp>,v1=<base64url digest>` in [`SIGNATURE_HEADER`]. A
//! verified payload names the changed document type (and slug), which maps to
//! the site paths whose rendered output is now stale.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;

pub const SIGNATURE_HEADER: &str = "sanity-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevalidateError {
    #[error("revalidation secret is not configured")]
    MissingSecret,
    #[error("signature header is missing")]
    MissingSignature,
    #[error("signature header is malformed: {0}")]
    MalformedSignature(&'static str),
    #[error("signature does not match payload")]
    SignatureMismatch,
    #[error("payload could not be parsed: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: String,
    digest: Vec<u8>,
}

fn parse_signature_header(value: &str) -> Result<SignatureHeader, RevalidateError> {
    let mut timestamp = None;
    let mut encoded = None;

    for part in value.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = Some(t.trim()),
            Some(("v1", v1)) => encoded = Some(v1.trim()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(RevalidateError::MalformedSignature("missing timestamp"))?;
    if timestamp.is_empty() || !timestamp.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(RevalidateError::MalformedSignature("timestamp is not numeric"));
    }

    let encoded = encoded.ok_or(RevalidateError::MalformedSignature("missing v1 digest"))?;
    let digest = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .or_else(|_| STANDARD.decode(encoded))
        .map_err(|_| RevalidateError::MalformedSignature("digest is not base64"))?;

    Ok(SignatureHeader {
        timestamp: timestamp.to_string(),
        digest,
    })
}

fn digest(secret: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Produce a signature header value the way the CMS does.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let timestamp = timestamp.to_string();
    let encoded = URL_SAFE_NO_PAD.encode(digest(secret, &timestamp, body));
    format!("t={timestamp},v1={encoded}")
}

pub fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), RevalidateError> {
    let parsed = parse_signature_header(header)?;
    let expected = digest(secret, &parsed.timestamp, body);
    if expected.as_slice().ct_eq(parsed.digest.as_slice()).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(RevalidateError::SignatureMismatch)
    }
}

/// Slugs arrive either projected (`"slug": "x"`) or raw (`"slug": {"current": "x"}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum SlugField {
    Plain(String),
    Object { current: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevalidatePayload {
    #[serde(rename = "type", alias = "_type")]
    pub kind: String,
    #[serde(default)]
    slug: Option<SlugField>,
}

impl RevalidatePayload {
    pub fn slug(&self) -> Option<&str> {
        let slug = match self.slug.as_ref()? {
            SlugField::Plain(slug) => slug.as_str(),
            SlugField::Object { current } => current.as_deref()?,
        };
        let slug = slug.trim().trim_matches('/');
        (!slug.is_empty()).then_some(slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Only the listed paths.
    Paths,
    /// A layout-wide change; every cached page is stale.
    Everything,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationPlan {
    pub paths: Vec<String>,
    pub scope: InvalidationScope,
}

/// Map a changed document to the paths that render it. Unknown types fall
/// back to the home page.
pub fn plan(kind: &str, slug: Option<&str>) -> RevalidationPlan {
    let mut scope = InvalidationScope::Paths;
    let mut paths: Vec<String> = match kind {
        "post" => {
            let mut paths = vec!["/news".to_string()];
            if let Some(slug) = slug {
                paths.push(format!("/news/{slug}"));
            }
            paths.push("/".to_string());
            paths
        }
        "guide" => {
            let mut paths = vec!["/guides".to_string()];
            if let Some(slug) = slug {
                paths.push(format!("/guides/{slug}"));
            }
            paths
        }
        "category" => vec!["/news".to_string(), "/guides".to_string()],
        "author" => vec!["/news".to_string()],
        "page" => match slug {
            Some(slug) if slug != "home" => vec![format!("/{slug}")],
            _ => vec!["/".to_string()],
        },
        "siteSettings" => {
            scope = InvalidationScope::Everything;
            vec!["/".to_string()]
        }
        _ => vec!["/".to_string()],
    };
    paths.dedup();

    RevalidationPlan { paths, scope }
}

/// Verifies webhook calls against the shared secret.
#[derive(Clone)]
pub struct Revalidator {
    secret: Option<String>,
}

impl Revalidator {
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret.filter(|secret| !secret.is_empty());
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn authorize(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<RevalidatePayload, RevalidateError> {
        let secret = self.secret.as_deref().ok_or(RevalidateError::MissingSecret)?;
        let signature = signature.ok_or(RevalidateError::MissingSignature)?;
        verify_signature(secret, signature, body)?;

        serde_json::from_slice(body).map_err(|err| RevalidateError::InvalidPayload(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub paths: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub now: i64,
}

impl RevalidateResponse {
    pub fn completed(paths: Vec<String>) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Self {
            revalidated: true,
            paths,
            now: i64::try_from(now).unwrap_or(i64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "shaft-7";

    #[test]
    fn signed_payload_verifies() {
        let body = br#"{"type":"post","slug":"deep-core"}"#;
        let header = sign(SECRET, 1_700_000_000_000, body);
        assert_eq!(verify_signature(SECRET, &header, body), Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign(SECRET, 1_700_000_000_000, br#"{"type":"post"}"#);
        assert_eq!(
            verify_signature(SECRET, &header, br#"{"type":"guide"}"#),
            Err(RevalidateError::SignatureMismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"type":"post"}"#;
        let header = sign("other", 1, body);
        assert_eq!(
            verify_signature(SECRET, &header, body),
            Err(RevalidateError::SignatureMismatch)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(matches!(
            verify_signature(SECRET, "v1=abc", b"{}"),
            Err(RevalidateError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify_signature(SECRET, "t=abc,v1=abc", b"{}"),
            Err(RevalidateError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify_signature(SECRET, "t=1,v1=***", b"{}"),
            Err(RevalidateError::MalformedSignature(_))
        ));
    }

    #[test]
    fn post_maps_to_listing_and_detail() {
        let plan = plan("post", Some("deep-core"));
        assert_eq!(plan.paths, vec!["/news", "/news/deep-core", "/"]);
        assert_eq!(plan.scope, InvalidationScope::Paths);
    }

    #[test]
    fn slugless_post_only_touches_listing() {
        assert_eq!(plan("post", None).paths, vec!["/news", "/"]);
    }

    #[test]
    fn site_settings_invalidate_everything() {
        let plan = plan("siteSettings", None);
        assert_eq!(plan.paths, vec!["/"]);
        assert_eq!(plan.scope, InvalidationScope::Everything);
    }

    #[test]
    fn unknown_type_defaults_to_home() {
        assert_eq!(plan("pointOfInterest", Some("x")).paths, vec!["/"]);
    }

    #[test]
    fn home_page_maps_to_root() {
        assert_eq!(plan("page", Some("home")).paths, vec!["/"]);
        assert_eq!(plan("page", Some("about")).paths, vec!["/about"]);
    }

    #[test]
    fn payload_accepts_raw_slug_objects_and_underscore_type() {
        let payload: RevalidatePayload =
            serde_json::from_str(r#"{"_type":"guide","slug":{"current":"/ore-101/"}}"#)
                .expect("payload");
        assert_eq!(payload.kind, "guide");
        assert_eq!(payload.slug(), Some("ore-101"));
    }

    #[test]
    fn revalidator_requires_secret_then_signature() {
        let body = br#"{"type":"post"}"#;
        assert_eq!(
            Revalidator::new(None).authorize(Some("t=1,v1=x"), body),
            Err(RevalidateError::MissingSecret)
        );
        let revalidator = Revalidator::new(Some(SECRET.to_string()));
        assert_eq!(
            revalidator.authorize(None, body),
            Err(RevalidateError::MissingSignature)
        );

        let header = sign(SECRET, 42, body);
        let payload = revalidator.authorize(Some(&header), body).expect("payload");
        assert_eq!(payload.kind, "post");
        assert_eq!(payload.slug(), None);
    }
}
