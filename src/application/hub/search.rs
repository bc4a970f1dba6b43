/// A lower-cased free-text query. Blank input produces no needle at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchNeedle(String);

impl SearchNeedle {
    pub fn parse(input: Option<&str>) -> Option<Self> {
        let trimmed = input?.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when any field contains the needle; absent or empty fields never match.
    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
        fields.into_iter().flatten().any(|field| self.matches(field))
    }

    fn matches(&self, field: &str) -> bool {
        !field.is_empty() && field.to_lowercase().contains(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_has_no_needle() {
        assert_eq!(SearchNeedle::parse(None), None);
        assert_eq!(SearchNeedle::parse(Some("   ")), None);
    }

    #[test]
    fn matching_ignores_case() {
        let needle = SearchNeedle::parse(Some("MINING")).expect("needle");
        assert_eq!(needle.as_str(), "mining");
        assert!(needle.matches_any([Some("Asteroid Mining 101")]));
        assert!(!needle.matches_any([None, Some("")]));
    }
}
