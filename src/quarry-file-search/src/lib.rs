#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args
)]
//! Quarry File Search - Cancellable, concurrency-bounded file search.
//!
//! This crate provides a file-search engine that walks one or more root
//! directories in parallel, matching files against an optional fuzzy
//! pattern (via nucleo-matcher) and include/exclude glob expressions,
//! with symlink-cycle protection and a hard cap on result count.
//!
//! # Features
//!
//! - Fuzzy file name and path matching using nucleo-matcher
//! - Glob patterns with brace alternation and sibling-aware exclusion
//! - Bounded parallel traversal over multiple roots
//! - Symlink-cycle safety via canonical-path tracking
//! - Cooperative cancellation mid-walk
//! - Optional .gitignore support via the `ignore` crate
//!
//! # Example
//!
//! ```no_run
//! use quarry_file_search::{SearchConfig, SearchEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SearchConfig::builder(["/path/to/project"])
//!         .file_pattern("util")
//!         .max_results(100)
//!         .build();
//!
//!     let engine = SearchEngine::new(config);
//!     let (matches, outcome) = engine.search_collect().await?;
//!     for m in matches {
//!         println!("{}", m.absolute_path.display());
//!     }
//!     if outcome.limit_hit {
//!         eprintln!("results truncated");
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod matcher;
mod result;
mod search;
mod walker;

pub use config::{GlobRule, SearchConfig, SearchConfigBuilder};
pub use error::{SearchError, SearchResult};
pub use matcher::{expand_braces, glob_match, FuzzyMatcher, GlobExpression};
pub use result::{FileMatch, SearchOutcome};
pub use search::{OnProgress, SearchEngine, SearchProgress};
pub use walker::{DirectoryWalker, OnResult};

/// Re-export anyhow for convenience
pub use anyhow;
