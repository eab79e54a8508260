//! Search result types.

use std::path::PathBuf;

use crate::error::SearchError;

/// A single matched file, streamed to the caller as soon as it is found.
///
/// No ordering is guaranteed between matches; callers that want ranking
/// can sort on [`score`](Self::score) after the search completes.
#[derive(Debug, Clone)]
pub struct FileMatch {
    /// The absolute path to the file.
    pub absolute_path: PathBuf,

    /// The path relative to the search root that produced the match.
    /// For standalone extra files this equals the absolute path.
    pub relative_path: String,

    /// The fuzzy match score when a file pattern was given (higher is
    /// better). `None` when the search had no pattern.
    pub score: Option<u32>,
}

impl FileMatch {
    /// Creates a match without a fuzzy score.
    pub fn new(absolute_path: PathBuf, relative_path: impl Into<String>) -> Self {
        Self {
            absolute_path,
            relative_path: relative_path.into(),
            score: None,
        }
    }

    /// Creates a match carrying a fuzzy score.
    pub fn with_score(
        absolute_path: PathBuf,
        relative_path: impl Into<String>,
        score: u32,
    ) -> Self {
        Self {
            absolute_path,
            relative_path: relative_path.into(),
            score: Some(score),
        }
    }

    /// Returns the file name component of the match.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

impl PartialEq for FileMatch {
    fn eq(&self, other: &Self) -> bool {
        self.absolute_path == other.absolute_path
    }
}

impl Eq for FileMatch {}

/// The completion value of a search.
///
/// A search that started walking always completes with an outcome, even
/// when cancelled or when individual directories failed to read. Traversal
/// errors are folded into [`error`](Self::error) rather than aborting the
/// walk.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Whether the result cap was reached and further matches were dropped.
    pub limit_hit: bool,

    /// Number of results delivered to the caller.
    pub result_count: usize,

    /// The first traversal error encountered, if any.
    pub error: Option<SearchError>,
}

impl SearchOutcome {
    /// Returns true if the walk finished without recording any error.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}
