//! Exclusion rules
//!
//! Patterns without a `/` are matched against every segment of a relative
//! path; patterns containing a `/` are matched against the whole path.

use crate::paths::RelativePath;

/// Patterns that are always active, ahead of any configured ones.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".DS_Store",
    ".idea",
    ".vscode",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".terraform",
    ".venv",
    "venv",
    "node_modules",
    "dist",
    "build",
    "target",
    "coverage",
    ".coverage",
    ".cache",
    "scripts",
];

/// Ordered list of exclusion patterns: built-ins first, then extra patterns in
/// the order they were supplied.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    patterns: Vec<String>,
}

impl ExcludeSet {
    /// Built-in patterns followed by `extra`.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(extra.into_iter().map(|p| normalize_pattern(p.as_ref())))
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, path: &RelativePath) -> bool {
        is_excluded(path, &self.patterns)
    }
}

impl Default for ExcludeSet {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

fn normalize_pattern(pattern: &str) -> String {
    pattern.replace('\\', "/")
}

/// Whether `path` is excluded by any of `patterns`. The empty path never is.
pub fn is_excluded<S: AsRef<str>>(path: &RelativePath, patterns: &[S]) -> bool {
    if path.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref();
        if pattern.contains('/') {
            matches_pattern(path.as_str(), pattern)
        } else {
            path.segments().any(|segment| matches_pattern(segment, pattern))
        }
    })
}

/// Shell-style glob match supporting `*`, `?`, `[seq]` and `[!seq]`.
///
/// `*` also matches `/`, so `build/*` covers everything below `build`.
/// Iterative with a single backtrack point for the most recent `*`.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let mut p = 0;
    let mut n = 0;
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        let advance = match pattern.get(p) {
            Some('*') => {
                p += 1;
                star = Some((p, n));
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match match_class(&pattern[p..], name[n]) {
                Some((true, len)) => Some(p + len),
                Some((false, _)) => None,
                // No closing bracket: a literal '['
                None => (name[n] == '[').then_some(p + 1),
            },
            Some(&c) => (c == name[n]).then_some(p + 1),
            None => None,
        };

        match advance {
            Some(next) => {
                p = next;
                n += 1;
            }
            None => match star {
                Some((star_p, star_n)) => {
                    p = star_p;
                    n = star_n + 1;
                    star = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match `ch` against the bracket expression at the start of `class`.
///
/// Returns whether it matched and the length of the expression, or `None`
/// when the bracket is never closed.
fn match_class(class: &[char], ch: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negated = class.get(i) == Some(&'!');
    if negated {
        i += 1;
    }

    let first = i;
    let mut matched = false;
    loop {
        let c = *class.get(i)?;
        // A ']' right after the opening is a member, not the terminator.
        if c == ']' && i > first {
            break;
        }
        match (class.get(i + 1), class.get(i + 2)) {
            (Some('-'), Some(&end)) if end != ']' => {
                if c <= ch && ch <= end {
                    matched = true;
                }
                i += 3;
            }
            _ => {
                if c == ch {
                    matched = true;
                }
                i += 1;
            }
        }
    }

    Some((matched != negated, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s)
    }

    // ==========================================================================
    // PATTERN MATCHING TESTS
    // ==========================================================================

    #[test]
    fn test_pattern_matching() {
        assert!(matches_pattern("test.md", "*.md"));
        assert!(matches_pattern("test.md", "test.*"));
        assert!(matches_pattern("test.md", "test.md"));
        assert!(matches_pattern("test.md", "????.md"));
        assert!(!matches_pattern("test.md", "*.txt"));
        assert!(!matches_pattern("test.md", "foo.*"));
        assert!(matches_pattern("a", "*"));
        assert!(matches_pattern("", "*"));
        assert!(!matches_pattern("", "?"));
    }

    #[test]
    fn test_pattern_matching_asterisk_middle() {
        assert!(matches_pattern("test-file.md", "test-*.md"));
        assert!(matches_pattern("test-.md", "test-*.md"));
        assert!(matches_pattern("test-abc-xyz.md", "test-*.md"));
        assert!(!matches_pattern("test.md", "test-*.md"));
    }

    #[test]
    fn test_pattern_matching_multiple_asterisks() {
        assert!(matches_pattern("abc.def.txt", "*.*.*"));
        assert!(matches_pattern("a.b.c", "*.*.*"));
        assert!(!matches_pattern("a.b", "*.*.*"));
    }

    #[test]
    fn test_pattern_matching_edge_cases() {
        assert!(matches_pattern("", ""));
        assert!(!matches_pattern("a", ""));
        assert!(!matches_pattern("", "a"));
        assert!(matches_pattern("*", "*"));
        assert!(matches_pattern("?", "?"));
    }

    #[test]
    fn test_pattern_matching_character_classes() {
        assert!(matches_pattern("file1.log", "file[0-9].log"));
        assert!(!matches_pattern("filex.log", "file[0-9].log"));
        assert!(matches_pattern("filex.log", "file[!0-9].log"));
        assert!(matches_pattern("b", "[abc]"));
        assert!(!matches_pattern("d", "[abc]"));
        assert!(matches_pattern("]", "[]]"));
        assert!(matches_pattern("-", "[a-]"));
    }

    #[test]
    fn test_pattern_matching_unclosed_bracket_is_literal() {
        assert!(matches_pattern("[abc", "[abc"));
        assert!(!matches_pattern("a", "[abc"));
    }

    #[test]
    fn test_star_crosses_separators() {
        assert!(matches_pattern("build/tmp/x/y", "build/tmp/*"));
        assert!(!matches_pattern("other/build/tmp/x", "build/tmp/*"));
    }

    // ==========================================================================
    // EXCLUSION TESTS
    // ==========================================================================

    #[test]
    fn test_segment_pattern_matches_any_depth() {
        let patterns = ["node_modules"];
        assert!(is_excluded(&rel("a/node_modules/b/c.txt"), &patterns));
        assert!(is_excluded(&rel("node_modules"), &patterns));
        assert!(!is_excluded(&rel("a/node_modules_x/c.txt"), &patterns));
    }

    #[test]
    fn test_segment_pattern_is_whole_segment() {
        let patterns = ["dist"];
        assert!(is_excluded(&rel("a/dist/b"), &patterns));
        assert!(is_excluded(&rel("dist"), &patterns));
        assert!(!is_excluded(&rel("distribution"), &patterns));
        assert!(is_excluded(&rel("distribution"), &["dist*"]));
    }

    #[test]
    fn test_full_path_pattern_is_anchored() {
        let patterns = ["build/tmp/*"];
        assert!(is_excluded(&rel("build/tmp/x"), &patterns));
        assert!(!is_excluded(&rel("other/build/tmp/x"), &patterns));
        assert!(!is_excluded(&rel("build/tmp"), &patterns));
    }

    #[test]
    fn test_empty_path_never_excluded() {
        assert!(!is_excluded(&RelativePath::default(), &["*"]));
    }

    #[test]
    fn test_exclude_set_keeps_builtins() {
        let set = ExcludeSet::new(["*.log"]);
        assert_eq!(set.patterns()[0], ".git");
        assert_eq!(set.patterns().last().unwrap(), "*.log");
        assert!(set.is_excluded(&rel("src/.git/config")));
        assert!(set.is_excluded(&rel("logs/out.log")));
        assert!(!set.is_excluded(&rel("src/main.rs")));
    }

    #[test]
    fn test_exclude_set_normalizes_backslashes() {
        let set = ExcludeSet::new([r"docs\generated\*"]);
        assert!(set.is_excluded(&rel("docs/generated/index.html")));
        assert!(!set.is_excluded(&rel("docs/index.html")));
    }

    #[test]
    fn test_default_excludes_tool_directory() {
        let set = ExcludeSet::default();
        assert!(set.is_excluded(&rel("scripts")));
        assert!(set.is_excluded(&rel("app/__pycache__/mod.pyc")));
    }
}
