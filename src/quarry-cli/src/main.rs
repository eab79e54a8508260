//! Quarry CLI - Main entry point.
//!
//! Runs one search request against the given roots and streams matching
//! absolute paths to stdout. Diagnostics and the truncation notice go to
//! stderr so the output stays pipe-friendly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use quarry_file_search::{FileMatch, GlobRule, OnResult, SearchConfig, SearchEngine};

/// Search for files under one or more root directories.
#[derive(Debug, Parser)]
#[command(name = "quarry", version, about)]
struct Cli {
    /// Root directories to search.
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Fuzzy file pattern. An absolute path matches exactly that file;
    /// a pattern containing '/' also tries `<root>/<pattern>` directly.
    #[arg(short, long)]
    pattern: Option<String>,

    /// Include glob; may be repeated.
    #[arg(short, long)]
    include: Vec<String>,

    /// Exclude glob; may be repeated.
    #[arg(short = 'x', long)]
    exclude: Vec<String>,

    /// Sibling-conditioned exclude as GLOB=SIBLING, e.g.
    /// '**/*.js=$(basename).ts'; may be repeated.
    #[arg(long, value_name = "GLOB=SIBLING", value_parser = parse_exclude_when)]
    exclude_when: Vec<(String, String)>,

    /// Standalone file checked against the patterns without walking;
    /// may be repeated.
    #[arg(long)]
    extra_file: Vec<PathBuf>,

    /// Stop after this many results.
    #[arg(short = 'n', long)]
    max_results: Option<usize>,

    /// Match the fuzzy pattern's case exactly.
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Honor <root>/.gitignore during traversal.
    #[arg(long)]
    gitignore: bool,

    /// Cancel the search after this many milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print fuzzy scores alongside paths.
    #[arg(long)]
    scores: bool,
}

fn parse_exclude_when(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(glob, sibling)| (glob.to_string(), sibling.to_string()))
        .ok_or_else(|| format!("expected GLOB=SIBLING, got '{raw}'"))
}

fn build_config(cli: &Cli) -> SearchConfig {
    let mut exclude: Vec<GlobRule> = cli.exclude.iter().map(GlobRule::new).collect();
    exclude.extend(
        cli.exclude_when
            .iter()
            .map(|(glob, sibling)| GlobRule::when_sibling(glob, sibling)),
    );

    let mut builder = SearchConfig::builder(cli.roots.clone())
        .extra_files(cli.extra_file.clone())
        .include(cli.include.clone())
        .exclude(exclude)
        .case_sensitive(cli.case_sensitive)
        .respect_gitignore(cli.gitignore);
    if let Some(pattern) = &cli.pattern {
        builder = builder.file_pattern(pattern);
    }
    if let Some(max) = cli.max_results {
        builder = builder.max_results(max);
    }
    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);
    let engine = Arc::new(SearchEngine::new(config));

    if let Some(ms) = cli.timeout_ms {
        let engine = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            engine.cancel();
        });
    }

    let show_scores = cli.scores;
    let on_result: OnResult = Arc::new(move |m: FileMatch| match (show_scores, m.score) {
        (true, Some(score)) => println!("{score}\t{}", m.absolute_path.display()),
        _ => println!("{}", m.absolute_path.display()),
    });

    let outcome = engine.search(on_result, None).await?;

    if let Some(err) = &outcome.error {
        warn!("search completed with error: {err}");
    }
    if outcome.limit_hit {
        eprintln!("results truncated at {}", outcome.result_count);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exclude_when() {
        let (glob, sibling) = parse_exclude_when("**/*.js=$(basename).ts").unwrap();
        assert_eq!(glob, "**/*.js");
        assert_eq!(sibling, "$(basename).ts");

        assert!(parse_exclude_when("no-equals-sign").is_err());
    }

    #[test]
    fn test_build_config() {
        let cli = Cli::parse_from([
            "quarry",
            "/proj/src",
            "--pattern",
            "util",
            "-x",
            "**/node_modules/**",
            "--exclude-when",
            "**/*.js=$(basename).ts",
            "-n",
            "50",
            "--case-sensitive",
            "--gitignore",
        ]);
        let config = build_config(&cli);

        assert_eq!(config.roots, vec![PathBuf::from("/proj/src")]);
        assert_eq!(config.file_pattern.as_deref(), Some("util"));
        assert_eq!(config.exclude.len(), 2);
        assert_eq!(
            config.exclude[1],
            GlobRule::when_sibling("**/*.js", "$(basename).ts")
        );
        assert_eq!(config.max_results, Some(50));
        assert!(config.case_sensitive);
        assert!(config.respect_gitignore);
    }
}
