//! Fuzzy and glob pattern matching.
//!
//! Two matchers live here: a nucleo-backed [`FuzzyMatcher`] for scoring
//! file names against a typed query, and a glob engine ([`glob_match`],
//! [`GlobExpression`]) for include/exclude filtering during traversal.

use nucleo_matcher::{
    Config, Matcher, Utf32Str,
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
};

use crate::config::GlobRule;
use crate::error::{SearchError, SearchResult};

/// Fuzzy matcher powered by nucleo-matcher.
///
/// This provides high-performance fuzzy matching suitable for
/// real-time file search.
#[derive(Debug)]
pub struct FuzzyMatcher {
    matcher: Matcher,
    case_sensitive: bool,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    /// Creates a new fuzzy matcher with default settings.
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            case_sensitive: false,
        }
    }

    /// Creates a new fuzzy matcher with case-sensitive matching.
    pub fn case_sensitive() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            case_sensitive: true,
        }
    }

    /// Sets the case sensitivity of the matcher.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    /// Computes the fuzzy match score for a pattern against a haystack.
    ///
    /// Returns `None` if there is no match, or `Some(score)` where
    /// higher scores indicate better matches.
    pub fn score(&mut self, pattern: &str, haystack: &str) -> Option<u32> {
        if pattern.is_empty() {
            return Some(0);
        }

        if haystack.is_empty() {
            return None;
        }

        let case_matching = if self.case_sensitive {
            CaseMatching::Respect
        } else {
            CaseMatching::Smart
        };

        let pat = Pattern::new(
            pattern,
            case_matching,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );

        let mut haystack_buf = Vec::new();
        let haystack_chars = Utf32Str::new(haystack, &mut haystack_buf);

        pat.score(haystack_chars, &mut self.matcher)
    }

    /// Checks if a pattern matches a haystack at all.
    pub fn matches(&mut self, pattern: &str, haystack: &str) -> bool {
        self.score(pattern, haystack).is_some()
    }
}

/// Matches a string against a glob pattern.
///
/// Supports the following patterns:
/// - `*` matches any sequence of characters except path separators
/// - `**` matches any sequence including path separators
/// - `?` matches a single character
/// - `[abc]` matches any character in the set
/// - `[!abc]` matches any character not in the set
/// - `{a,b}` matches either alternative
pub fn glob_match(pattern: &str, text: &str) -> bool {
    // Normalize path separators
    let pattern = pattern.replace('\\', "/");
    let text = text.replace('\\', "/");

    expand_braces(&pattern)
        .iter()
        .any(|pat| glob_match_recursive(pat, &text))
}

fn glob_match_recursive(pattern: &str, text: &str) -> bool {
    let mut pat_chars = pattern.chars().peekable();
    let mut txt_chars = text.chars().peekable();

    while let Some(p) = pat_chars.next() {
        match p {
            '*' => {
                // Check for **
                if pat_chars.peek() == Some(&'*') {
                    pat_chars.next(); // consume second *

                    // Skip any trailing slash after **
                    if pat_chars.peek() == Some(&'/') {
                        pat_chars.next();
                    }

                    let remaining_pattern: String = pat_chars.collect();

                    // ** at end matches everything
                    if remaining_pattern.is_empty() {
                        return true;
                    }

                    // Try matching ** against zero or more path segments
                    let remaining_text: String = txt_chars.collect();

                    if glob_match_recursive(&remaining_pattern, &remaining_text) {
                        return true;
                    }

                    for (i, c) in remaining_text.char_indices() {
                        if glob_match_recursive(
                            &remaining_pattern,
                            &remaining_text[i + c.len_utf8()..],
                        ) {
                            return true;
                        }
                    }

                    return false;
                } else {
                    // Single * - matches any characters except /
                    let remaining_pattern: String = pat_chars.collect();
                    let remaining_text: String = txt_chars.collect();

                    if glob_match_recursive(&remaining_pattern, &remaining_text) {
                        return true;
                    }

                    for (i, c) in remaining_text.char_indices() {
                        if c == '/' {
                            // Single * cannot match /
                            break;
                        }
                        if glob_match_recursive(
                            &remaining_pattern,
                            &remaining_text[i + c.len_utf8()..],
                        ) {
                            return true;
                        }
                    }

                    return false;
                }
            }
            '?' => {
                // ? matches any single character except /
                match txt_chars.next() {
                    Some(c) if c != '/' => continue,
                    _ => return false,
                }
            }
            '[' => {
                // Character class
                let txt_c = match txt_chars.next() {
                    Some(c) => c,
                    None => return false,
                };

                let negated = pat_chars.peek() == Some(&'!') || pat_chars.peek() == Some(&'^');
                if negated {
                    pat_chars.next();
                }

                let mut matched = false;
                let mut prev_char: Option<char> = None;

                loop {
                    match pat_chars.next() {
                        None => return false, // Unclosed bracket
                        Some(']') => break,
                        Some('-') => {
                            // Range
                            if let (Some(start), Some(end)) = (prev_char, pat_chars.peek().copied())
                                && end != ']'
                            {
                                pat_chars.next();
                                if txt_c >= start && txt_c <= end {
                                    matched = true;
                                }
                                prev_char = None;
                                continue;
                            }
                            // Literal -
                            if txt_c == '-' {
                                matched = true;
                            }
                            prev_char = Some('-');
                        }
                        Some(c) => {
                            if txt_c == c {
                                matched = true;
                            }
                            prev_char = Some(c);
                        }
                    }
                }

                if matched == negated {
                    return false;
                }
            }
            c => {
                // Literal character
                match txt_chars.next() {
                    Some(tc) if tc == c => continue,
                    _ => return false,
                }
            }
        }
    }

    // Pattern exhausted - text should also be exhausted
    txt_chars.next().is_none()
}

/// Expands brace alternations in a pattern.
///
/// `{a,b}` expands to multiple patterns; nested braces are supported.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    // Find the first top-level brace group
    let mut depth = 0;
    let mut brace_start = None;
    let mut brace_end = None;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => {
                if depth == 0 {
                    brace_start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 && brace_start.is_some() {
                    brace_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let (start, end) = match (brace_start, brace_end) {
        (Some(s), Some(e)) => (s, e),
        _ => return vec![pattern.to_string()],
    };

    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();
    let brace_content: String = chars[start + 1..end].iter().collect();

    let alternatives = split_brace_alternatives(&brace_content);

    let mut results = Vec::new();
    for alt in alternatives {
        let combined = format!("{prefix}{alt}{suffix}");
        // Recursively expand in case there are more braces
        results.extend(expand_braces(&combined));
    }
    results
}

/// Splits brace content on top-level commas, respecting nested braces.
fn split_brace_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0;

    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                alternatives.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    alternatives
}

/// Validates a glob pattern, returning the reason it is malformed.
///
/// Checks that character classes are closed and brace groups are balanced.
/// A `]` directly after `[` (or after the `!`/`^` negation marker) is a
/// literal and does not close the class.
pub fn validate_glob(pattern: &str) -> Result<(), String> {
    let mut chars = pattern.chars().peekable();
    let mut brace_depth = 0i32;

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                if chars.peek() == Some(&'!') || chars.peek() == Some(&'^') {
                    chars.next();
                }
                // Leading ] is a literal member of the class
                let mut first = true;
                let mut closed = false;
                for cc in chars.by_ref() {
                    if cc == ']' && !first {
                        closed = true;
                        break;
                    }
                    first = false;
                }
                if !closed {
                    return Err("unclosed character class".to_string());
                }
            }
            '{' => brace_depth += 1,
            '}' => {
                brace_depth -= 1;
                if brace_depth < 0 {
                    return Err("unbalanced '}'".to_string());
                }
            }
            _ => {}
        }
    }

    if brace_depth != 0 {
        return Err("unclosed brace group".to_string());
    }
    Ok(())
}

/// A single compiled exclusion/inclusion rule.
#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: String,
    when_sibling: Option<String>,
}

/// A compiled set of glob rules evaluated against relative paths.
///
/// Rules may be conditioned on the presence of a sibling file: such a rule
/// only applies when the directory listing passed to [`matches`] contains
/// the name produced by substituting the candidate's extensionless name for
/// `$(basename)` in the clause. With an empty sibling listing, conditioned
/// rules never apply.
///
/// [`matches`]: GlobExpression::matches
#[derive(Debug, Clone, Default)]
pub struct GlobExpression {
    rules: Vec<CompiledRule>,
}

impl GlobExpression {
    /// Compiles a set of rules, validating each pattern up front.
    pub fn compile(rules: &[GlobRule]) -> SearchResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            validate_glob(&rule.pattern)
                .map_err(|reason| SearchError::invalid_glob(&rule.pattern, reason))?;
            compiled.push(CompiledRule {
                pattern: rule.pattern.replace('\\', "/"),
                when_sibling: rule.when_sibling.clone(),
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Compiles plain patterns without sibling clauses.
    pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> SearchResult<Self> {
        let rules: Vec<GlobRule> = patterns
            .iter()
            .map(|p| GlobRule::new(p.as_ref()))
            .collect();
        Self::compile(&rules)
    }

    /// Returns true if no rules are present.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tests a relative path against the rule set.
    ///
    /// `siblings` is the listing of the directory containing the candidate;
    /// it gates sibling-conditioned rules only.
    pub fn matches(&self, relative_path: &str, siblings: &[String]) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let relative = relative_path.replace('\\', "/");
        let basename = relative.rsplit('/').next().unwrap_or(&relative);

        for rule in &self.rules {
            let hit = glob_match(&rule.pattern, &relative)
                // Separator-less patterns also try the file name alone
                || (!rule.pattern.contains('/') && glob_match(&rule.pattern, basename));
            if !hit {
                continue;
            }

            match &rule.when_sibling {
                None => return true,
                Some(clause) => {
                    let stem = match basename.rfind('.') {
                        Some(idx) if idx > 0 => &basename[..idx],
                        _ => basename,
                    };
                    let required = clause.replace("$(basename)", stem);
                    if siblings.iter().any(|s| s == &required) {
                        return true;
                    }
                }
            }
        }
        false
    }
}
