use std::collections::HashSet;

/// Synonym groups for one tag category. The first member of a group is its canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantTable {
    groups: Vec<Vec<String>>,
}

impl VariantTable {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }

    pub fn from_static(groups: &[&[&str]]) -> Self {
        Self::new(
            groups
                .iter()
                .map(|group| group.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Canonical form of `tag`, or `tag` itself when no group contains it.
    /// Matching is exact and case-sensitive; the first matching group wins.
    pub fn canonicalize<'a>(&'a self, tag: &'a str) -> &'a str {
        self.groups
            .iter()
            .find(|group| group.iter().any(|member| member == tag))
            .and_then(|group| group.first())
            .map(String::as_str)
            .unwrap_or(tag)
    }

    /// Canonicalize every tag and keep only the first occurrence of each result
    pub fn dedupe<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        tags.iter()
            .map(|tag| self.canonicalize(tag.as_ref()).to_string())
            .filter(|tag| seen.insert(tag.clone()))
            .collect()
    }
}
