//! Path scopes a filter applies to

/// Set of path prefixes. A path is in scope when it starts with any entry;
/// matching is byte-wise and case-sensitive with no slash normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathScope {
    prefixes: Vec<String>,
}

impl PathScope {
    pub fn new<S: Into<String>>(prefixes: impl IntoIterator<Item = S>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_scope(&self, path: &str) -> bool {
        in_scope(path, &self.prefixes)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Returns true if `path` starts with at least one of `scopes`
pub fn in_scope(path: &str, scopes: &[String]) -> bool {
    scopes.iter().any(|scope| path.starts_with(scope.as_str()))
}
