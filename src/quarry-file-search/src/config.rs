//! Configuration types for file search.

use std::path::PathBuf;

/// A single exclude rule: a glob pattern, optionally conditioned on the
/// presence of a sibling file in the same directory.
///
/// A sibling clause uses the `$(basename)` placeholder, which is replaced
/// with the candidate file's name minus its extension. For example the rule
/// `**/*.js` with clause `$(basename).ts` excludes `foo.js` only when
/// `foo.ts` exists next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobRule {
    /// The glob pattern evaluated against the candidate's relative path.
    pub pattern: String,

    /// Optional sibling clause conditioning the rule.
    pub when_sibling: Option<String>,
}

impl GlobRule {
    /// Creates an unconditional rule.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            when_sibling: None,
        }
    }

    /// Creates a rule that only applies when a sibling named by `clause`
    /// exists in the same directory.
    pub fn when_sibling(pattern: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            when_sibling: Some(clause.into()),
        }
    }
}

/// Configuration for one search request.
///
/// A configuration is immutable for the duration of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Root directories to search, each walked independently and
    /// concurrently.
    pub roots: Vec<PathBuf>,

    /// Standalone file paths considered outside any root walk (for example
    /// open-but-unsaved editor buffers). Each is checked against the
    /// patterns directly and never walked into.
    pub extra_files: Vec<PathBuf>,

    /// Optional fuzzy file pattern. A pattern containing a path separator
    /// also enables relative-path fast matching against each root.
    pub file_pattern: Option<String>,

    /// Include patterns a matching file must additionally satisfy.
    pub include: Vec<String>,

    /// Exclude rules; any match skips the entry.
    pub exclude: Vec<GlobRule>,

    /// Caps the number of emitted results when set.
    pub max_results: Option<usize>,

    /// Whether fuzzy matching respects the pattern's case exactly.
    /// When false, lowercase patterns match case-insensitively.
    pub case_sensitive: bool,

    /// Whether to honor `<root>/.gitignore` during traversal.
    pub respect_gitignore: bool,
}

impl SearchConfig {
    /// Creates a new configuration for the given root directories.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Creates a builder for constructing a configuration.
    pub fn builder(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> SearchConfigBuilder {
        SearchConfigBuilder::new(roots)
    }
}

/// Builder for creating [`SearchConfig`] instances.
#[derive(Debug)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Creates a new builder with the specified root directories.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            config: SearchConfig::new(roots),
        }
    }

    /// Sets the standalone files considered outside any root walk.
    pub fn extra_files(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.config.extra_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the fuzzy file pattern.
    pub fn file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.file_pattern = Some(pattern.into());
        self
    }

    /// Sets the include patterns.
    pub fn include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the exclude rules.
    pub fn exclude(mut self, rules: impl IntoIterator<Item = GlobRule>) -> Self {
        self.config.exclude = rules.into_iter().collect();
        self
    }

    /// Adds a single unconditional exclude pattern.
    pub fn add_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude.push(GlobRule::new(pattern));
        self
    }

    /// Sets the result cap.
    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = Some(max);
        self
    }

    /// Sets whether fuzzy matching respects the pattern's case exactly.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.config.case_sensitive = case_sensitive;
        self
    }

    /// Sets whether to honor `<root>/.gitignore` during traversal.
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.config.respect_gitignore = respect;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SearchConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert!(config.roots.is_empty());
        assert!(config.file_pattern.is_none());
        assert!(config.max_results.is_none());
        assert!(!config.case_sensitive);
        assert!(!config.respect_gitignore);
    }

    #[test]
    fn test_config_builder() {
        let config = SearchConfig::builder(["/proj/src", "/proj/test"])
            .file_pattern("util")
            .add_exclude("**/node_modules/**")
            .max_results(100)
            .case_sensitive(true)
            .respect_gitignore(true)
            .build();

        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.file_pattern.as_deref(), Some("util"));
        assert_eq!(config.exclude, vec![GlobRule::new("**/node_modules/**")]);
        assert_eq!(config.max_results, Some(100));
        assert!(config.case_sensitive);
        assert!(config.respect_gitignore);
    }

    #[test]
    fn test_sibling_rule() {
        let rule = GlobRule::when_sibling("**/*.js", "$(basename).ts");
        assert_eq!(rule.pattern, "**/*.js");
        assert_eq!(rule.when_sibling.as_deref(), Some("$(basename).ts"));
    }
}
