//! High-level search engine façade.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SearchConfig;
use crate::error::SearchResult;
use crate::result::{FileMatch, SearchOutcome};
use crate::walker::{DirectoryWalker, OnResult};

/// Progress snapshot passed to a progress callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchProgress {
    /// Results delivered so far.
    pub results: usize,
}

/// Callback type for progress reporting.
pub type OnProgress = Arc<dyn Fn(SearchProgress) + Send + Sync>;

/// File search engine: one instance serves exactly one search request.
///
/// Holds the request configuration and the walker that executes it.
/// Results stream through the caller's callback as they are found;
/// [`cancel`](Self::cancel) may be called from another task at any time
/// and the search still settles with an outcome.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use quarry_file_search::{SearchConfig, SearchEngine};
///
/// # async fn run() -> quarry_file_search::SearchResult<()> {
/// let config = SearchConfig::builder(["/proj/src"])
///     .file_pattern("util")
///     .add_exclude("**/node_modules/**")
///     .max_results(100)
///     .build();
///
/// let engine = SearchEngine::new(config);
/// let on_result = Arc::new(|m: quarry_file_search::FileMatch| {
///     println!("{}", m.absolute_path.display());
/// });
/// let outcome = engine.search(on_result, None).await?;
/// if outcome.limit_hit {
///     eprintln!("results truncated");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SearchEngine {
    config: SearchConfig,
    walker: DirectoryWalker,
}

impl SearchEngine {
    /// Creates an engine for one search request.
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            walker: DirectoryWalker::new(),
        }
    }

    /// Returns the request configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the search, streaming matches through `on_result`.
    ///
    /// `on_progress` is a reserved hook: the walker does not report
    /// progress and callers must not assume periodic invocations.
    ///
    /// Resolves once all branches have settled. `Err` is returned only
    /// for configuration errors; traversal errors and the limit-hit flag
    /// arrive in the [`SearchOutcome`].
    pub async fn search(
        &self,
        on_result: OnResult,
        on_progress: Option<OnProgress>,
    ) -> SearchResult<SearchOutcome> {
        let _ = on_progress;
        self.walker.walk(&self.config, on_result).await
    }

    /// Runs the search and collects all matches into a vector.
    ///
    /// No ordering is guaranteed.
    pub async fn search_collect(&self) -> SearchResult<(Vec<FileMatch>, SearchOutcome)> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();
        let on_result: OnResult = Arc::new(move |m| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(m);
        });

        let outcome = self.walker.walk(&self.config, on_result).await?;
        let matches = std::mem::take(
            &mut *results.lock().unwrap_or_else(PoisonError::into_inner),
        );
        Ok((matches, outcome))
    }

    /// Requests cancellation of an in-flight search.
    pub fn cancel(&self) {
        self.walker.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobRule;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "content").unwrap();
    }

    fn relative_paths(matches: &[FileMatch]) -> Vec<String> {
        let mut paths: Vec<String> = matches.iter().map(|m| m.relative_path.clone()).collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_unfiltered_lists_every_file_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt");
        write(dir.path(), "sub/b.txt");
        write(dir.path(), "sub/deep/c.txt");
        write(dir.path(), "other/d.txt");

        let engine = SearchEngine::new(SearchConfig::new([dir.path()]));
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert!(outcome.is_clean());
        assert!(!outcome.limit_hit);
        assert_eq!(
            relative_paths(&matches),
            vec!["a.txt", "other/d.txt", "sub/b.txt", "sub/deep/c.txt"]
        );
        assert_eq!(outcome.result_count, 4);
    }

    #[tokio::test]
    async fn test_fuzzy_pattern_filters_results() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/utils.ts");
        write(dir.path(), "src/unrelated.ts");
        write(dir.path(), "test/util_test.ts");

        let config = SearchConfig::builder([dir.path().join("src"), dir.path().join("test")])
            .file_pattern("util")
            .build();
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert!(outcome.is_clean());
        assert_eq!(relative_paths(&matches), vec!["util_test.ts", "utils.ts"]);
        assert!(matches.iter().all(|m| m.score.is_some()));
    }

    #[tokio::test]
    async fn test_case_sensitive_pattern() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lower_util.ts");
        write(dir.path(), "UPPER_UTIL.TS");

        let config = SearchConfig::builder([dir.path()])
            .file_pattern("util")
            .build();
        let engine = SearchEngine::new(config);
        assert!(!engine.config().case_sensitive);
        let (matches, _) = engine.search_collect().await.unwrap();
        assert_eq!(
            relative_paths(&matches),
            vec!["UPPER_UTIL.TS", "lower_util.ts"]
        );

        let config = SearchConfig::builder([dir.path()])
            .file_pattern("util")
            .case_sensitive(true)
            .build();
        let engine = SearchEngine::new(config);
        assert!(engine.config().case_sensitive);
        let (matches, _) = engine.search_collect().await.unwrap();
        assert_eq!(relative_paths(&matches), vec!["lower_util.ts"]);
    }

    #[tokio::test]
    async fn test_exclude_prunes_whole_subtree() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.ts");
        write(dir.path(), "node_modules/pkg/index.js");
        write(dir.path(), "src/node_modules/dep/lib.js");

        let config = SearchConfig::builder([dir.path()])
            .add_exclude("**/node_modules/**")
            .build();
        let engine = SearchEngine::new(config);
        let (matches, _) = engine.search_collect().await.unwrap();

        assert_eq!(relative_paths(&matches), vec!["src/app.ts"]);
    }

    #[tokio::test]
    async fn test_include_filters_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs");
        write(dir.path(), "src/notes.txt");
        write(dir.path(), "README.md");

        let config = SearchConfig::builder([dir.path()])
            .include(["**/*.rs"])
            .build();
        let engine = SearchEngine::new(config);
        let (matches, _) = engine.search_collect().await.unwrap();

        assert_eq!(relative_paths(&matches), vec!["src/main.rs"]);
    }

    #[tokio::test]
    async fn test_max_results_caps_emission() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("file{i}.txt"));
        }

        let config = SearchConfig::builder([dir.path()]).max_results(3).build();
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert_eq!(matches.len(), 3);
        assert!(outcome.limit_hit);
        assert_eq!(outcome.result_count, 3);
    }

    #[tokio::test]
    async fn test_absolute_pattern_is_sole_result() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "target.txt");
        write(dir.path(), "other.txt");
        let target = dir.path().join("target.txt");

        let config = SearchConfig::builder([dir.path()])
            .file_pattern(target.to_str().unwrap())
            .build();
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert!(outcome.is_clean());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].absolute_path, target);
    }

    #[tokio::test]
    async fn test_relative_pattern_not_emitted_twice() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs");
        write(dir.path(), "src/other.rs");

        let config = SearchConfig::builder([dir.path()])
            .file_pattern("src/main.rs")
            .build();
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert!(outcome.is_clean());
        assert_eq!(relative_paths(&matches), vec!["src/main.rs"]);
    }

    #[tokio::test]
    async fn test_extra_files_checked_against_patterns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "kept.rs");
        write(dir.path(), "dropped.log");

        let config = SearchConfig::builder(Vec::<std::path::PathBuf>::new())
            .extra_files([dir.path().join("kept.rs"), dir.path().join("dropped.log")])
            .add_exclude("*.log")
            .build();
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert!(outcome.is_clean());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].absolute_path, dir.path().join("kept.rs"));
    }

    #[tokio::test]
    async fn test_sibling_rule_and_literal_request() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.ts");
        write(dir.path(), "a.js");
        write(dir.path(), "b.js");

        let exclude = [GlobRule::when_sibling("**/*.js", "$(basename).ts")];

        // a.js hides behind its compiled-from sibling, b.js stays
        let config = SearchConfig::builder([dir.path()])
            .exclude(exclude.clone())
            .build();
        let engine = SearchEngine::new(config);
        let (matches, _) = engine.search_collect().await.unwrap();
        assert_eq!(relative_paths(&matches), vec!["a.ts", "b.js"]);

        // Typing the name verbatim overrides the sibling rule
        let config = SearchConfig::builder([dir.path()])
            .exclude(exclude)
            .file_pattern("a.js")
            .build();
        let engine = SearchEngine::new(config);
        let (matches, _) = engine.search_collect().await.unwrap();
        assert_eq!(relative_paths(&matches), vec!["a.js"]);
    }

    #[tokio::test]
    async fn test_gitignore_is_opt_in() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.rs");
        write(dir.path(), "debug.log");
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();

        let engine = SearchEngine::new(SearchConfig::new([dir.path()]));
        let (matches, _) = engine.search_collect().await.unwrap();
        assert!(relative_paths(&matches).contains(&"debug.log".to_string()));

        let config = SearchConfig::builder([dir.path()])
            .respect_gitignore(true)
            .build();
        let engine = SearchEngine::new(config);
        let (matches, _) = engine.search_collect().await.unwrap();
        let paths = relative_paths(&matches);
        assert!(paths.contains(&"app.rs".to_string()));
        assert!(!paths.contains(&"debug.log".to_string()));
    }

    #[tokio::test]
    async fn test_idempotent_result_set() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.rs");
        write(dir.path(), "nested/two.rs");
        write(dir.path(), "nested/deeper/three.rs");

        let config = SearchConfig::new([dir.path()]);
        let (first, _) = SearchEngine::new(config.clone())
            .search_collect()
            .await
            .unwrap();
        let (second, _) = SearchEngine::new(config).search_collect().await.unwrap();

        assert_eq!(relative_paths(&first), relative_paths(&second));
    }

    #[tokio::test]
    async fn test_cancel_from_result_callback_settles() {
        let dir = TempDir::new().unwrap();
        for i in 0..200 {
            write(dir.path(), &format!("sub{}/f{i}.txt", i % 8));
        }

        let engine = Arc::new(SearchEngine::new(SearchConfig::new([dir.path()])));
        let seen = Arc::new(Mutex::new(0usize));

        let on_result: OnResult = {
            let engine = engine.clone();
            let seen = seen.clone();
            Arc::new(move |_m| {
                *seen.lock().unwrap() += 1;
                engine.cancel();
            })
        };

        let outcome = engine.search(on_result, None).await.unwrap();
        assert!(outcome.is_clean());
        assert!(!outcome.limit_hit);

        // Cancellation is cooperative: a few in-flight entries may still
        // land, but the walk must stop well short of the full tree.
        let seen = *seen.lock().unwrap();
        assert!(seen >= 1);
        assert!(seen < 200);
        assert_eq!(outcome.result_count, seen);
    }

    #[tokio::test]
    async fn test_missing_root_surfaces_first_error_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "present.txt");

        let config = SearchConfig::new([
            dir.path().to_path_buf(),
            std::path::PathBuf::from("/no/such/root/one"),
            std::path::PathBuf::from("/no/such/root/two"),
        ]);
        let engine = SearchEngine::new(config);
        let (matches, outcome) = engine.search_collect().await.unwrap();

        assert_eq!(relative_paths(&matches), vec!["present.txt"]);
        assert!(outcome.error.is_some());
    }
}
