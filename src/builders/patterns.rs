use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors raised while turning a glob into a [`Pattern`].
///
/// These surface when the rules are registered, never while changed files are
/// being evaluated, so a broken configuration fails before any decision is made.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A `}` without a matching `{`, or a `{` that is never closed.
    #[error("unbalanced brace in glob '{glob}'")]
    UnbalancedBrace { glob: String },
    /// The generated (or user supplied) expression was rejected by the regex engine.
    #[error("invalid pattern '{glob}': {source}")]
    Regex {
        glob: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled match rule derived from a glob.
///
/// The pattern keeps the text it was written as (for diagnostics such as
/// "triggered by app/models/user.rb via app/models/**/*") together with the
/// compiled expression. Two patterns are equal when their compiled expressions
/// are identical, which is what lets a rule set collapse duplicate registrations.
#[derive(Debug, Clone)]
pub struct Pattern {
    glob: String,
    regex: Regex,
}

impl Pattern {
    /// Builds a pattern from a raw regular expression, bypassing glob translation.
    pub fn from_regex(expression: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(expression).map_err(|source| PatternError::Regex {
            glob: expression.to_string(),
            source,
        })?;
        Ok(Self {
            glob: expression.to_string(),
            regex,
        })
    }

    /// The text this pattern was registered with.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The regular expression the glob was translated into.
    pub fn as_regex(&self) -> &str {
        self.regex.as_str()
    }

    /// Tests a path. The expression is not anchored: a match anywhere in the
    /// path counts, so `app/models` also matches `app/models/user.rb`.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.regex.as_str().hash(state);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glob)
    }
}

/// The two shapes a rule can be registered with: a glob still to be translated,
/// or a pattern that was already compiled.
#[derive(Debug, Clone)]
pub enum PatternSource {
    Glob(String),
    Compiled(Pattern),
}

impl From<&str> for PatternSource {
    fn from(glob: &str) -> Self {
        PatternSource::Glob(glob.to_string())
    }
}

impl From<String> for PatternSource {
    fn from(glob: String) -> Self {
        PatternSource::Glob(glob)
    }
}

impl From<Pattern> for PatternSource {
    fn from(pattern: Pattern) -> Self {
        PatternSource::Compiled(pattern)
    }
}

/// Translates a glob into a [`Pattern`]. An already compiled pattern is
/// returned unchanged.
///
/// The glob is scanned once from left to right, always taking the longest
/// token available at the current position:
///
/// * `**/*` matches anything, separators included.
/// * `**/` matches zero or more whole directories.
/// * `*` matches within a single path segment.
/// * `{a,b}` becomes a non-capturing alternation (groups may nest).
/// * every other character, `.` included, matches itself literally.
///
/// # Arguments
/// * `source`: A glob string or a precompiled `Pattern`.
///
/// # Returns
/// The compiled `Pattern`, matched anywhere in a path, or a `PatternError`
/// when the braces are unbalanced.
pub fn translate(source: impl Into<PatternSource>) -> Result<Pattern, PatternError> {
    match source.into() {
        PatternSource::Compiled(pattern) => Ok(pattern),
        PatternSource::Glob(glob) => {
            let expression = glob_to_regex(&glob)?;
            let regex = Regex::new(&expression).map_err(|source| PatternError::Regex {
                glob: glob.clone(),
                source,
            })?;
            Ok(Pattern { glob, regex })
        }
    }
}

fn glob_to_regex(glob: &str) -> Result<String, PatternError> {
    let unbalanced = || PatternError::UnbalancedBrace {
        glob: glob.to_string(),
    };

    let mut expression = String::with_capacity(glob.len() * 2);
    let mut depth = 0usize;
    let mut rest = glob;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with("**/*") {
            expression.push_str(".*");
            rest = &rest[4..];
            continue;
        }
        if rest.starts_with("**/") {
            expression.push_str("(?:.*/)?");
            rest = &rest[3..];
            continue;
        }

        match ch {
            '*' => expression.push_str("[^/]*"),
            '{' => {
                depth += 1;
                expression.push_str("(?:");
            }
            '}' => {
                if depth == 0 {
                    return Err(unbalanced());
                }
                depth -= 1;
                expression.push(')');
            }
            ',' if depth > 0 => expression.push('|'),
            // `.` and every other metacharacter are taken literally.
            other => {
                let mut buf = [0; 4];
                expression.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
        rest = &rest[ch.len_utf8()..];
    }

    if depth != 0 {
        return Err(unbalanced());
    }
    Ok(expression)
}
