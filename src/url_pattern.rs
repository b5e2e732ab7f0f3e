use crate::{Error, ErrorKind};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use std::fmt;

///
/// The URL pattern a mock is scoped to. Matched against the full request URL.
///
/// Glob patterns support:
///
/// - `**` as a whole path segment matches any number of segments
/// - `*` matches any sequence of characters except `/`
/// - `?` matches a single character except `/`
/// - `[ab]` matches one character of the class
/// - `{a,b}` matches either alternative
///
/// Everything else is matched literally.
///
/// ## Example
///
/// ```
/// use fetchmock::UrlPattern;
///
/// let pattern = UrlPattern::glob("**/api/*.json").unwrap();
///
/// assert!(pattern.matches("https://example.com/v1/api/users.json"));
/// assert!(!pattern.matches("https://example.com/v1/api/users/1.json"));
/// ```
///
#[derive(Clone, Debug)]
pub struct UrlPattern {
    source: String,
    kind: PatternKind,
}

#[derive(Clone, Debug)]
enum PatternKind {
    Glob(GlobMatcher),
    Regex(Regex),
    Literal,
}

impl UrlPattern {
    /// Compiles a glob pattern.
    pub fn glob(pattern: &str) -> Result<Self, Error> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidUrlPattern, err))?;

        Ok(Self {
            source: pattern.to_string(),
            kind: PatternKind::Glob(glob.compile_matcher()),
        })
    }

    ///
    /// Uses a regular expression instead of a glob. The expression is searched for anywhere in
    /// the URL unless it is anchored.
    ///
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern)
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidUrlPattern, err))?;

        Ok(Self::from(regex))
    }

    /// Matches `url` only when it is exactly `pattern`.
    pub fn literal(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
            kind: PatternKind::Literal,
        }
    }

    /// Whether `url` satisfies the pattern.
    pub fn matches(&self, url: &str) -> bool {
        match self.kind {
            PatternKind::Glob(ref glob) => glob.is_match(url),
            PatternKind::Regex(ref regex) => regex.is_match(url),
            PatternKind::Literal => self.source == url,
        }
    }

    /// The pattern as it was given.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

///
/// Strings are globs. A string that is not a valid glob, such as one with an unclosed `{`,
/// only matches the identical URL.
///
impl<'a> From<&'a str> for UrlPattern {
    fn from(value: &str) -> Self {
        UrlPattern::glob(value).unwrap_or_else(|err| {
            log::warn!("Glob {} will be matched literally: {}", value, err);
            UrlPattern::literal(value)
        })
    }
}

impl From<String> for UrlPattern {
    fn from(value: String) -> Self {
        UrlPattern::from(value.as_str())
    }
}

impl From<Regex> for UrlPattern {
    fn from(regex: Regex) -> Self {
        Self {
            source: regex.as_str().to_string(),
            kind: PatternKind::Regex(regex),
        }
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        let same_kind = matches!(
            (&self.kind, &other.kind),
            (PatternKind::Glob(_), PatternKind::Glob(_))
                | (PatternKind::Regex(_), PatternKind::Regex(_))
                | (PatternKind::Literal, PatternKind::Literal)
        );

        same_kind && self.source == other.source
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::UrlPattern;
    use crate::ErrorKind;

    #[test]
    fn test_double_star_spans_segments() {
        let pattern = UrlPattern::glob("**/foobar/**").unwrap();

        assert!(pattern.matches("http://test.com/foobar/test.html"));
        assert!(pattern.matches("http://test.com/a/b/foobar/c/d.html"));
        assert!(!pattern.matches("http://test.com/barfoo/test.html"));
    }

    #[test]
    fn test_single_star_stays_within_segment() {
        let pattern = UrlPattern::glob("http://test.com/*.html").unwrap();

        assert!(pattern.matches("http://test.com/index.html"));
        assert!(!pattern.matches("http://test.com/nested/index.html"));
    }

    #[test]
    fn test_question_mark_and_alternatives() {
        let pattern = UrlPattern::glob("**/img?.{png,svg}").unwrap();

        assert!(pattern.matches("http://test.com/img1.png"));
        assert!(pattern.matches("http://test.com/assets/img2.svg"));
        assert!(!pattern.matches("http://test.com/img1.gif"));
        assert!(!pattern.matches("http://test.com/img12.png"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = UrlPattern::glob("http://test.com/search?q=(a+b)").unwrap();

        assert!(pattern.matches("http://test.com/search?q=(a+b)"));
        assert!(pattern.matches("http://test.com/search!q=(a+b)"));
        assert!(!pattern.matches("http://test.com/search?q=aab"));
    }

    #[test]
    fn test_unclosed_brace() {
        let err = UrlPattern::glob("**/a{b").unwrap_err();
        assert_eq!(ErrorKind::InvalidUrlPattern, err.kind);

        let pattern = UrlPattern::from("**/a{b");
        assert!(pattern.matches("**/a{b"));
        assert!(!pattern.matches("http://test.com/a{b"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        assert!(UrlPattern::regex("(unclosed").is_err());
        assert!(UrlPattern::regex(r"/foobar/\w+\.html$").is_ok());
    }

    #[test]
    fn test_equality_includes_the_kind() {
        assert_eq!(UrlPattern::from("**/a"), UrlPattern::glob("**/a").unwrap());
        assert_ne!(UrlPattern::from("**/a"), UrlPattern::literal("**/a"));
    }
}
