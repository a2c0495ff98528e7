use crate::util::path;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("illegal exclusion pattern: \"!\"")]
    IllegalExclusion,

    #[error("syntax error in pattern {0:?}")]
    BadPattern(String),

    #[error("compiling pattern {pattern:?}: {source}")]
    Compile {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
struct Pattern {
    regex: Regex,
    dirs: usize,
    exclusion: bool,
}

/// Ordered `.dockerignore` patterns
///
/// Patterns are anchored at the context root. Evaluation runs over every pattern
/// and the last one that matches decides; a `!` pattern that matches re-includes
/// the path. A pattern that misses the path is retried against the leading
/// directories of the path, so `vendor` also excludes `vendor/a/b.go`.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<Pattern>,
}

impl PatternMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let mut compiled = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let trimmed = raw.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }

            let cleaned = path::clean(trimmed);
            let (exclusion, text) = match cleaned.strip_prefix('!') {
                Some("") => return Err(PatternError::IllegalExclusion),
                Some(rest) => (true, rest.to_string()),
                None => (false, cleaned),
            };

            compiled.push(Pattern {
                regex: compile(&text)?,
                dirs: text.split('/').count(),
                exclusion,
            });
        }

        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a context-relative, `/`-separated path is excluded
    pub fn matches(&self, file: &str) -> bool {
        let file = path::clean(file);
        let parent = path::parent(&file);
        let parent_dirs: Vec<&str> = parent.split('/').collect();

        let mut matched = false;
        for pattern in &self.patterns {
            let mut hit = pattern.regex.is_match(&file);
            if !hit && parent != "." && pattern.dirs <= parent_dirs.len() {
                hit = pattern.regex.is_match(&parent_dirs[..pattern.dirs].join("/"));
            }
            if hit {
                matched = !pattern.exclusion;
            }
        }
        matched
    }
}

fn compile(pattern: &str) -> Result<Regex, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if in_class {
            match ch {
                ']' => {
                    in_class = false;
                    re.push(']');
                }
                '\\' => {
                    i += 1;
                    let escaped = chars
                        .get(i)
                        .ok_or_else(|| PatternError::BadPattern(pattern.to_string()))?;
                    re.push_str(&regex::escape(&escaped.to_string()));
                }
                // set operators and nested classes in the regex engine
                '[' | '&' | '~' => {
                    re.push('\\');
                    re.push(ch);
                }
                _ => re.push(ch),
            }
            i += 1;
            continue;
        }

        match ch {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                }
                if i + 1 >= chars.len() {
                    re.push_str(".*");
                } else {
                    re.push_str("(.*/)?");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '[' => {
                in_class = true;
                re.push('[');
            }
            '\\' => {
                i += 1;
                let escaped = chars
                    .get(i)
                    .ok_or_else(|| PatternError::BadPattern(pattern.to_string()))?;
                re.push_str(&regex::escape(&escaped.to_string()));
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    if in_class {
        return Err(PatternError::BadPattern(pattern.to_string()));
    }
    re.push('$');

    Regex::new(&re).map_err(|source| PatternError::Compile {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn matcher(patterns: &[&str]) -> PatternMatcher {
        PatternMatcher::new(patterns).unwrap()
    }

    #[parameterized(
        exact = { "README.md", "README.md", true },
        star_same_dir = { "*.log", "debug.log", true },
        star_no_cross = { "*.log", "logs/debug.log", false },
        double_star_prefix = { "**/*.log", "logs/deep/debug.log", true },
        double_star_root = { "**/*.log", "debug.log", true },
        double_star_suffix = { "build/**", "build/out/app", true },
        double_star_suffix_dir_itself = { "build/**", "build", false },
        question_mark = { "file?.txt", "file1.txt", true },
        question_no_slash = { "a?b", "a/b", false },
        char_class = { "[a-c].txt", "b.txt", true },
        char_class_miss = { "[a-c].txt", "d.txt", false },
        parent_dir = { "node_modules", "node_modules/pkg/index.js", true },
        nested_parent_dir = { "src/gen", "src/gen/a/b.rs", true },
        dot_literal = { "a.b", "axb", false }
    )]
    fn test_single_pattern(pattern: &str, path: &str, expected: bool) {
        assert_eq!(matcher(&[pattern]).matches(path), expected);
    }

    #[test]
    fn test_exclusion_reincludes() {
        let m = matcher(&["*.md", "!README.md"]);

        assert!(m.matches("CHANGELOG.md"));
        assert!(!m.matches("README.md"));
    }

    #[test]
    fn test_last_match_wins() {
        let m = matcher(&["!keep.txt", "*.txt"]);
        assert!(m.matches("keep.txt"));
    }

    #[test]
    fn test_empty_matcher_matches_nothing() {
        let m = PatternMatcher::new::<&str>(&[]).unwrap();
        assert!(m.is_empty());
        assert!(!m.matches("anything"));
    }

    #[test]
    fn test_blank_patterns_are_skipped() {
        let m = matcher(&["", "   ", "target"]);
        assert_eq!(m.patterns().collect::<Vec<_>>(), vec!["target"]);
    }

    #[test]
    fn test_illegal_exclusion() {
        assert!(matches!(
            PatternMatcher::new(&["!"]),
            Err(PatternError::IllegalExclusion)
        ));
    }

    #[test]
    fn test_unclosed_class_is_an_error() {
        assert!(matches!(
            PatternMatcher::new(&["[abc"]),
            Err(PatternError::BadPattern(_))
        ));
    }

    #[test]
    fn test_escaped_wildcard_is_literal() {
        let m = matcher(&["\\*.txt"]);
        assert!(m.matches("*.txt"));
        assert!(!m.matches("a.txt"));
    }
}
