use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{kind} `{slug}` is published more than once")]
    DuplicateSlug { kind: &'static str, slug: String },
    #[error("{kind} `{id}` has an empty slug")]
    EmptySlug { kind: &'static str, id: String },
    #[error("{kind} `{id}` has an empty title")]
    EmptyTitle { kind: &'static str, id: String },
}

impl DomainError {
    pub fn duplicate_slug(kind: &'static str, slug: impl Into<String>) -> Self {
        Self::DuplicateSlug {
            kind,
            slug: slug.into(),
        }
    }

    pub fn empty_slug(kind: &'static str, id: impl Into<String>) -> Self {
        Self::EmptySlug {
            kind,
            id: id.into(),
        }
    }

    pub fn empty_title(kind: &'static str, id: impl Into<String>) -> Self {
        Self::EmptyTitle {
            kind,
            id: id.into(),
        }
    }
}
