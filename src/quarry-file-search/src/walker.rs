//! Concurrent directory traversal.
//!
//! [`DirectoryWalker`] owns the per-search traversal state and performs
//! the recursive, concurrency-bounded walk: one task per root, a bounded
//! fan-out per directory, a canonical-path visited set to break symlink
//! cycles, and a cooperative cancellation flag polled at every unit of
//! work. Results stream through a callback as they are found; the walk
//! always converges to a [`SearchOutcome`] carrying the limit-hit flag
//! and the first traversal error, if any.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use ignore::gitignore::Gitignore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::matcher::{FuzzyMatcher, GlobExpression};
use crate::result::{FileMatch, SearchOutcome};

/// Upper bound on concurrently processed entries within one directory.
const ENTRY_CONCURRENCY: usize = 32;

/// Callback invoked once per matching file, never batched.
pub type OnResult = Arc<dyn Fn(FileMatch) + Send + Sync>;

/// Performs the recursive directory walk for one search.
///
/// A walker is scoped to a single [`walk`](Self::walk) invocation;
/// [`cancel`](Self::cancel) may be called concurrently from another task
/// and takes effect at the next checkpoint in every in-flight branch.
#[derive(Debug, Default)]
pub struct DirectoryWalker {
    canceled: Arc<AtomicBool>,
}

impl DirectoryWalker {
    /// Creates a new walker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of an in-flight walk.
    ///
    /// Safe to call at any time from any task; never blocks. In-flight
    /// filesystem calls are not aborted, but no branch schedules further
    /// work after observing the flag.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Runs the walk to completion.
    ///
    /// Returns `Err` only for configuration errors detected before any
    /// I/O (malformed glob patterns). Traversal errors never abort the
    /// walk: per-entry stat, resolve, and directory-read failures are
    /// collected and the first one is reported in the returned outcome.
    /// Dangling symlinks and non-UTF-8 entry names are expected states,
    /// skipped without being recorded.
    pub async fn walk(
        &self,
        config: &SearchConfig,
        on_result: OnResult,
    ) -> SearchResult<SearchOutcome> {
        let query = Query::compile(config)?;
        let state = Arc::new(WalkState::new(
            query,
            config,
            self.canceled.clone(),
            on_result,
        ));

        // Absolute literal fast path: a pattern naming an existing file
        // is the sole result and skips the walk entirely.
        if state.query.pattern_is_absolute {
            if let Some(pattern) = state.query.file_pattern.clone() {
                let candidate = PathBuf::from(&pattern);
                let meta = tokio::fs::metadata(&candidate).await;
                if state.is_canceled() {
                    return Ok(state.take_outcome());
                }
                if let Ok(meta) = meta
                    && !meta.is_dir()
                {
                    state.emit(FileMatch::new(candidate, pattern));
                    return Ok(state.take_outcome());
                }
            }
        }

        walk_extra_files(&state, &config.extra_files).await;

        let mut roots = JoinSet::new();
        for root in &config.roots {
            let state = state.clone();
            let root = root.clone();
            let respect_gitignore = config.respect_gitignore;
            roots.spawn(async move {
                walk_root(state, root, respect_gitignore).await;
            });
        }
        while let Some(joined) = roots.join_next().await {
            if let Err(err) = joined {
                debug!("root walk task failed to join: {err}");
            }
        }

        Ok(state.take_outcome())
    }
}

/// The compiled, immutable query shared by all branches of one walk.
struct Query {
    file_pattern: Option<String>,
    pattern_is_absolute: bool,
    pattern_has_separator: bool,
    exclude: GlobExpression,
    include: Option<GlobExpression>,
}

impl Query {
    fn compile(config: &SearchConfig) -> SearchResult<Self> {
        let file_pattern = config
            .file_pattern
            .as_deref()
            .map(|p| p.replace('\\', "/"))
            .filter(|p| !p.is_empty());
        let pattern_is_absolute = file_pattern
            .as_deref()
            .is_some_and(|p| Path::new(p).is_absolute());
        let pattern_has_separator = file_pattern.as_deref().is_some_and(|p| p.contains('/'));

        let exclude = GlobExpression::compile(&config.exclude)?;
        let include = if config.include.is_empty() {
            None
        } else {
            Some(GlobExpression::compile_patterns(&config.include)?)
        };

        Ok(Self {
            file_pattern,
            pattern_is_absolute,
            pattern_has_separator,
            exclude,
            include,
        })
    }
}

/// Mutable state shared across all branches of one walk.
///
/// Created at the start of `walk()` and discarded with its outcome;
/// never shared across searches.
struct WalkState {
    query: Query,
    max_results: Option<usize>,
    visited: Mutex<HashSet<PathBuf>>,
    matched: AtomicUsize,
    emitted: AtomicUsize,
    limit_hit: AtomicBool,
    canceled: Arc<AtomicBool>,
    first_error: Mutex<Option<SearchError>>,
    fuzzy: Mutex<FuzzyMatcher>,
    on_result: OnResult,
}

impl WalkState {
    fn new(
        query: Query,
        config: &SearchConfig,
        canceled: Arc<AtomicBool>,
        on_result: OnResult,
    ) -> Self {
        let fuzzy = if config.case_sensitive {
            FuzzyMatcher::case_sensitive()
        } else {
            FuzzyMatcher::new()
        };
        Self {
            query,
            max_results: config.max_results,
            visited: Mutex::new(HashSet::new()),
            matched: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
            limit_hit: AtomicBool::new(false),
            canceled,
            first_error: Mutex::new(None),
            fuzzy: Mutex::new(fuzzy),
            on_result,
        }
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    fn is_limit_hit(&self) -> bool {
        self.limit_hit.load(Ordering::SeqCst)
    }

    /// True once this branch must stop scheduling work.
    fn should_stop(&self) -> bool {
        self.is_canceled() || self.is_limit_hit()
    }

    /// Retains the first error; later ones are logged and dropped.
    fn record_error(&self, err: SearchError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!("additional walk error dropped: {err}");
        }
    }

    /// Atomically marks a canonical directory path as entered.
    ///
    /// Returns false if the path was already visited in this search.
    fn mark_visited(&self, real_path: PathBuf) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(real_path)
    }

    /// The file-match test: fuzzy pattern, then include filter, then
    /// capped emission.
    fn match_file(&self, absolute: &Path, relative: &str) {
        let score = match self.query.file_pattern.as_deref() {
            None => None,
            Some(pattern) => {
                let matched = self
                    .fuzzy
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .score(pattern, relative);
                match matched {
                    None => return,
                    some => some,
                }
            }
        };

        if let Some(include) = &self.query.include
            && !include.matches(relative, &[])
        {
            return;
        }

        let file_match = match score {
            Some(score) => FileMatch::with_score(absolute.to_path_buf(), relative, score),
            None => FileMatch::new(absolute.to_path_buf(), relative),
        };
        self.emit(file_match);
    }

    /// Delivers one result unless the cap is crossed.
    ///
    /// The candidate that crosses the cap is swallowed, not delivered.
    fn emit(&self, file_match: FileMatch) {
        if self.should_stop() {
            return;
        }

        let candidate = self.matched.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(max) = self.max_results
            && candidate > max
        {
            self.limit_hit.store(true, Ordering::SeqCst);
            return;
        }

        self.emitted.fetch_add(1, Ordering::SeqCst);
        (self.on_result)(file_match);
    }

    fn take_outcome(&self) -> SearchOutcome {
        SearchOutcome {
            limit_hit: self.is_limit_hit(),
            result_count: self.emitted.load(Ordering::SeqCst),
            error: self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        }
    }
}

/// Per-root context shared by all branches under one root.
struct RootContext {
    gitignore: Option<Gitignore>,
}

/// Checks each standalone file against the patterns directly.
async fn walk_extra_files(state: &Arc<WalkState>, extra_files: &[PathBuf]) {
    for extra in extra_files {
        if state.should_stop() {
            return;
        }
        let relative = extra.to_string_lossy().replace('\\', "/");
        // No directory listing exists for a standalone file
        if state.query.exclude.matches(&relative, &[]) {
            continue;
        }
        state.match_file(extra, &relative);
    }
}

async fn walk_root(state: Arc<WalkState>, root: PathBuf, respect_gitignore: bool) {
    if state.should_stop() {
        return;
    }

    let real_root = match tokio::fs::canonicalize(&root).await {
        Ok(path) => path,
        Err(err) => {
            let err = if err.kind() == std::io::ErrorKind::NotFound {
                SearchError::root_not_found(&root)
            } else {
                SearchError::resolve_path(&root, err)
            };
            state.record_error(err);
            return;
        }
    };

    // Duplicate roots and roots reachable through each other collapse here
    if !state.mark_visited(real_root.clone()) {
        return;
    }

    // Relative fast path: a separator-bearing pattern naming an existing
    // file under this root matches immediately; the subtree walk skips
    // re-emitting it.
    if state.query.pattern_has_separator
        && !state.query.pattern_is_absolute
        && let Some(pattern) = state.query.file_pattern.clone()
    {
        let candidate = real_root.join(&pattern);
        let meta = tokio::fs::metadata(&candidate).await;
        if state.should_stop() {
            return;
        }
        if let Ok(meta) = meta
            && !meta.is_dir()
        {
            state.match_file(&candidate, &pattern);
        }
    }

    let gitignore = if respect_gitignore {
        load_gitignore(&real_root)
    } else {
        None
    };

    let entries = match read_dir_names(&real_root).await {
        Ok(entries) => entries,
        Err(err) => {
            // A root that names a file is a configuration mistake, not
            // a transient read failure
            let err = match err {
                SearchError::ReadDirectory { source, .. }
                    if source.kind() == std::io::ErrorKind::NotADirectory =>
                {
                    SearchError::not_a_directory(&root)
                }
                other => other,
            };
            state.record_error(err);
            return;
        }
    };

    let ctx = Arc::new(RootContext { gitignore });
    walk_dir(state, ctx, real_root, String::new(), entries).await;
}

fn load_gitignore(root: &Path) -> Option<Gitignore> {
    let path = root.join(".gitignore");
    let (gitignore, err) = Gitignore::new(&path);
    if let Some(err) = err {
        warn!("failed to read {}: {err}", path.display());
    }
    if gitignore.num_ignores() + gitignore.num_whitelists() > 0 {
        Some(gitignore)
    } else {
        None
    }
}

/// Walks one directory, processing its entries with bounded fan-out.
fn walk_dir(
    state: Arc<WalkState>,
    ctx: Arc<RootContext>,
    dir: PathBuf,
    dir_relative: String,
    entries: Vec<String>,
) -> BoxFuture<'static, ()> {
    async move {
        let siblings: Arc<[String]> = entries.clone().into();
        stream::iter(entries)
            .for_each_concurrent(ENTRY_CONCURRENCY, |name| {
                let state = state.clone();
                let ctx = ctx.clone();
                let dir = dir.clone();
                let dir_relative = dir_relative.clone();
                let siblings = siblings.clone();
                async move {
                    process_entry(state, ctx, dir, dir_relative, siblings, name).await;
                }
            })
            .await;
    }
    .boxed()
}

async fn process_entry(
    state: Arc<WalkState>,
    ctx: Arc<RootContext>,
    dir: PathBuf,
    dir_relative: String,
    siblings: Arc<[String]>,
    name: String,
) {
    if state.should_stop() {
        return;
    }

    let relative = join_relative(&dir_relative, &name);
    let absolute = dir.join(&name);

    // An entry named exactly like the typed pattern is an explicit
    // request: sibling-conditioned exclude rules must not hide it.
    let literal_request = state.query.file_pattern.as_deref() == Some(name.as_str());
    let excluded = if literal_request {
        state.query.exclude.matches(&relative, &[])
    } else {
        state.query.exclude.matches(&relative, &siblings)
    };
    if excluded {
        return;
    }

    let lstat = match tokio::fs::symlink_metadata(&absolute).await {
        Ok(meta) => meta,
        Err(err) => {
            debug!("skipping {}: {err}", absolute.display());
            state.record_error(SearchError::stat(&absolute, err));
            return;
        }
    };

    let is_dir = if lstat.file_type().is_symlink() {
        match tokio::fs::metadata(&absolute).await {
            Ok(meta) => meta.is_dir(),
            Err(err) => {
                // Broken symlink
                debug!("skipping {}: {err}", absolute.display());
                return;
            }
        }
    } else {
        lstat.is_dir()
    };

    if let Some(gitignore) = &ctx.gitignore
        && gitignore.matched(&relative, is_dir).is_ignore()
    {
        return;
    }

    if is_dir {
        if state.should_stop() {
            return;
        }

        let real_path = match tokio::fs::canonicalize(&absolute).await {
            Ok(path) => path,
            Err(err) => {
                debug!("skipping {}: {err}", absolute.display());
                state.record_error(SearchError::resolve_path(&absolute, err));
                return;
            }
        };
        // Cycle guard
        if !state.mark_visited(real_path) {
            return;
        }

        let entries = match read_dir_names(&absolute).await {
            Ok(entries) => entries,
            Err(err) => {
                state.record_error(err);
                return;
            }
        };
        walk_dir(state, ctx, absolute, relative, entries).await;
    } else {
        // Already handled by the relative fast path for this root
        if state.query.pattern_has_separator
            && state.query.file_pattern.as_deref() == Some(relative.as_str())
        {
            return;
        }
        state.match_file(&absolute, &relative);
    }
}

/// Reads a directory's entry names. Non-UTF-8 names are skipped.
async fn read_dir_names(dir: &Path) -> SearchResult<Vec<String>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| SearchError::read_directory(dir, err))?;

    let mut names = Vec::new();
    loop {
        match reader.next_entry().await {
            Ok(Some(entry)) => match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => {
                    debug!("skipping non-UTF-8 entry {:?} in {}", name, dir.display());
                }
            },
            Ok(None) => break,
            Err(err) => return Err(SearchError::read_directory(dir, err)),
        }
    }
    Ok(names)
}

/// Joins a relative prefix and an entry name with forward slashes.
fn join_relative(dir_relative: &str, name: &str) -> String {
    if dir_relative.is_empty() {
        name.to_string()
    } else {
        format!("{dir_relative}/{name}")
    }
}
