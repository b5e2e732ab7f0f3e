use crate::headers::Headers;
use crate::{Error, ErrorKind};
use crate::url_pattern::UrlPattern;
use assert_json_diff::{assert_json_matches_no_panic, CompareMode};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type TextPredicate = dyn Fn(Option<&str>) -> bool + Send + Sync + 'static;
type HeadersPredicate = dyn Fn(&Headers) -> bool + Send + Sync + 'static;
type StatusPredicate = dyn Fn(u16) -> bool + Send + Sync + 'static;

///
/// Allows matching the request method, a response header value or the request body in multiple
/// ways: by the exact value, by any value (as long as it is present), by regular expression,
/// by JSON content, by a custom predicate or by checking that the value is missing.
///
/// These matchers are used within `Filter::method`, `Filter::header` and `Filter::post_data`.
///
#[derive(Clone)]
pub enum Matcher {
    /// Matches the exact value. There's also an implementation of `From<&str>`
    /// to keep things simple.
    Exact(String),
    /// Matches a value by a regular expression. See `Matcher::regex`.
    Regex(Regex),
    /// Matches a JSON body against a `serde_json::Value`
    Json(serde_json::Value),
    /// Matches a partial JSON body against a `serde_json::Value`
    PartialJson(serde_json::Value),
    /// Matches a URL-encoded key/value pair, where both key and value should be specified
    /// in plain (unencoded) format
    UrlEncoded(String, String),
    /// At least one matcher must match
    AnyOf(Vec<Matcher>),
    /// All matchers must match
    AllOf(Vec<Matcher>),
    /// Leaves the decision to a function. The function sees `None` when the value is absent.
    Predicate(Arc<TextPredicate>),
    /// Matches any value, as long as one is present.
    Any,
    /// Checks that the value is absent.
    Missing,
}

impl Matcher {
    /// Compiles `pattern` into a `Matcher::Regex`.
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Matcher::Regex)
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidMatcher, err))
    }

    /// Wraps a predicate into a matcher.
    pub fn predicate(f: impl Fn(Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        Matcher::Predicate(Arc::new(f))
    }

    pub(crate) fn matches_optional(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Matcher::Predicate(ref f), value) => f(value),
            (Matcher::Missing, value) => value.is_none(),
            (Matcher::AnyOf(ref matchers), None) => matchers.iter().any(|m| m.matches_optional(None)),
            (Matcher::AllOf(ref matchers), None) => matchers.iter().all(|m| m.matches_optional(None)),
            (_, None) => false,
            (_, Some(value)) => self.matches_value(value),
        }
    }

    pub(crate) fn matches_values(&self, values: &[&str]) -> bool {
        match self {
            Matcher::Missing => values.is_empty(),
            Matcher::Predicate(ref f) if values.is_empty() => f(None),
            // Missing matches against all values at once, the others against each value.
            Matcher::AnyOf(ref matchers) if values.is_empty() => {
                matchers.iter().any(|m| m.matches_values(values))
            }
            Matcher::AllOf(ref matchers) if values.is_empty() => {
                matchers.iter().all(|m| m.matches_values(values))
            }
            _ => !values.is_empty() && values.iter().all(|val| self.matches_value(val)),
        }
    }

    /// Method names compare case-insensitively; everything else goes through `matches_value`.
    pub(crate) fn matches_method(&self, method: &str) -> bool {
        match self {
            Matcher::Exact(ref value) => value.eq_ignore_ascii_case(method),
            Matcher::AnyOf(ref matchers) => matchers.iter().any(|m| m.matches_method(method)),
            Matcher::AllOf(ref matchers) => matchers.iter().all(|m| m.matches_method(method)),
            _ => self.matches_optional(Some(method)),
        }
    }

    pub(crate) fn matches_value(&self, other: &str) -> bool {
        match self {
            Matcher::Exact(ref value) => value == other,
            Matcher::Regex(ref regex) => regex.is_match(other),
            Matcher::Json(ref json_obj) => serde_json::from_str::<serde_json::Value>(other)
                .map(|other| *json_obj == other)
                .unwrap_or(false),
            Matcher::PartialJson(ref json_obj) => {
                let config = assert_json_diff::Config::new(CompareMode::Inclusive);
                serde_json::from_str::<serde_json::Value>(other)
                    .map(|actual| assert_json_matches_no_panic(&actual, json_obj, config).is_ok())
                    .unwrap_or(false)
            }
            Matcher::UrlEncoded(ref expected_field, ref expected_value) => {
                serde_urlencoded::from_str::<HashMap<String, String>>(other)
                    .map(|params| {
                        params.into_iter().any(|(ref field, ref value)| {
                            field == expected_field && value == expected_value
                        })
                    })
                    .unwrap_or(false)
            }
            Matcher::AnyOf(ref matchers) => matchers.iter().any(|m| m.matches_value(other)),
            Matcher::AllOf(ref matchers) => matchers.iter().all(|m| m.matches_value(other)),
            Matcher::Predicate(ref f) => f(Some(other)),
            Matcher::Any => true,
            Matcher::Missing => false,
        }
    }
}

impl<'a> From<&'a str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Exact(value.to_string())
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Exact(value)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |matchers: &[Matcher]| {
            matchers
                .iter()
                .map(Matcher::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            Matcher::Exact(ref value) => write!(f, "{}", value),
            Matcher::Regex(ref regex) => write!(f, "{} (regex)", regex),
            Matcher::Json(ref json_obj) => write!(f, "{} (json)", json_obj),
            Matcher::PartialJson(ref json_obj) => write!(f, "{} (partial json)", json_obj),
            Matcher::UrlEncoded(ref field, ref value) => {
                write!(f, "{}={} (urlencoded)", field, value)
            }
            Matcher::AnyOf(ref matchers) => write!(f, "({}) (any of)", join(matchers)),
            Matcher::AllOf(ref matchers) => write!(f, "({}) (all of)", join(matchers)),
            Matcher::Predicate(_) => f.write_str("(predicate)"),
            Matcher::Any => f.write_str("(any)"),
            Matcher::Missing => f.write_str("(missing)"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self)
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Exact(a), Matcher::Exact(b)) => a == b,
            (Matcher::Regex(a), Matcher::Regex(b)) => a.as_str() == b.as_str(),
            (Matcher::Json(a), Matcher::Json(b)) | (Matcher::PartialJson(a), Matcher::PartialJson(b)) => a == b,
            (Matcher::UrlEncoded(a, b), Matcher::UrlEncoded(c, d)) => a == c && b == d,
            (Matcher::AnyOf(a), Matcher::AnyOf(b)) | (Matcher::AllOf(a), Matcher::AllOf(b)) => a == b,
            (Matcher::Predicate(a), Matcher::Predicate(b)) => Arc::ptr_eq(a, b),
            (Matcher::Any, Matcher::Any) | (Matcher::Missing, Matcher::Missing) => true,
            _ => false,
        }
    }
}

///
/// Matches the response headers of an intercepted request.
///
#[derive(Clone)]
pub enum HeadersMatcher {
    /// Every listed field must match. Field names are compared case-insensitively.
    Fields(Vec<(String, Matcher)>),
    /// Receives the full header map, its answer is authoritative.
    Predicate(Arc<HeadersPredicate>),
}

impl HeadersMatcher {
    pub(crate) fn matches(&self, headers: &Headers) -> bool {
        match self {
            HeadersMatcher::Fields(ref fields) => fields
                .iter()
                .all(|(field, matcher)| matcher.matches_values(&headers.get_all(field))),
            HeadersMatcher::Predicate(ref f) => f(headers),
        }
    }
}

impl fmt::Debug for HeadersMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadersMatcher::Fields(ref fields) => f.debug_list().entries(fields).finish(),
            HeadersMatcher::Predicate(_) => f.write_str("(predicate)"),
        }
    }
}

///
/// Matches the response status code of an intercepted request.
///
#[derive(Clone)]
pub enum StatusMatcher {
    /// Exact equality.
    Exact(u16),
    /// Leaves the decision to a function.
    Predicate(Arc<StatusPredicate>),
}

impl StatusMatcher {
    /// An unknown status never matches.
    pub(crate) fn matches(&self, status: Option<u16>) -> bool {
        match (self, status) {
            (_, None) => false,
            (StatusMatcher::Exact(expected), Some(status)) => *expected == status,
            (StatusMatcher::Predicate(ref f), Some(status)) => f(status),
        }
    }
}

impl From<u16> for StatusMatcher {
    fn from(value: u16) -> Self {
        StatusMatcher::Exact(value)
    }
}

impl fmt::Debug for StatusMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMatcher::Exact(status) => write!(f, "{}", status),
            StatusMatcher::Predicate(_) => f.write_str("(predicate)"),
        }
    }
}

///
/// Narrows down which intercepted requests a mock applies to. Every field is optional, every
/// present field must match.
///
/// ## Example
///
/// ```
/// use fetchmock::{Filter, Matcher};
///
/// let filter = Filter::new()
///     .method("put")
///     .header("Content-Type", "text/xml")
///     .status_code_fn(|status| (200..300).contains(&status))
///     .post_data(Matcher::regex("^foo").unwrap());
/// ```
///
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub(crate) method: Option<Matcher>,
    pub(crate) headers: Option<HeadersMatcher>,
    pub(crate) status_code: Option<StatusMatcher>,
    pub(crate) post_data: Option<Matcher>,
}

impl Filter {
    /// A filter that lets everything through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the request method. Exact values ignore case.
    pub fn method<M: Into<Matcher>>(mut self, method: M) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Matches the request method with a function.
    pub fn method_fn(self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.method(Matcher::predicate(move |method| method.map_or(false, &f)))
    }

    ///
    /// Adds a response header condition. Can be called several times, all conditions must hold.
    /// Replaces a previously set `headers_fn`.
    ///
    pub fn header<M: Into<Matcher>>(mut self, field: &str, value: M) -> Self {
        let field = (field.to_lowercase(), value.into());
        match self.headers {
            Some(HeadersMatcher::Fields(ref mut fields)) => fields.push(field),
            _ => self.headers = Some(HeadersMatcher::Fields(vec![field])),
        }
        self
    }

    /// Matches the full response header map with a function.
    pub fn headers_fn(mut self, f: impl Fn(&Headers) -> bool + Send + Sync + 'static) -> Self {
        self.headers = Some(HeadersMatcher::Predicate(Arc::new(f)));
        self
    }

    /// Matches the response status code exactly.
    pub fn status_code(mut self, status: u16) -> Self {
        self.status_code = Some(StatusMatcher::Exact(status));
        self
    }

    /// Matches the response status code with a function.
    pub fn status_code_fn(mut self, f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.status_code = Some(StatusMatcher::Predicate(Arc::new(f)));
        self
    }

    /// Matches the raw request body.
    pub fn post_data<M: Into<Matcher>>(mut self, post_data: M) -> Self {
        self.post_data = Some(post_data.into());
        self
    }

    /// Matches the raw request body with a function. It sees `None` when there is no body.
    pub fn post_data_fn(self, f: impl Fn(Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        self.post_data(Matcher::predicate(f))
    }

    pub(crate) fn matches(&self, snapshot: &RequestSnapshot<'_>) -> bool {
        self.method
            .as_ref()
            .map_or(true, |m| m.matches_method(snapshot.method))
            && self
                .headers
                .as_ref()
                .map_or(true, |m| m.matches(snapshot.response_headers))
            && self
                .status_code
                .as_ref()
                .map_or(true, |m| m.matches(snapshot.status_code))
            && self
                .post_data
                .as_ref()
                .map_or(true, |m| m.matches_optional(snapshot.post_data))
    }
}

///
/// What the matcher gets to see of an intercepted request.
///
#[derive(Clone, Copy, Debug)]
pub struct RequestSnapshot<'a> {
    /// The full request URL
    pub url: &'a str,
    /// The request method
    pub method: &'a str,
    /// The response headers, empty while the request has not been answered yet
    pub response_headers: &'a Headers,
    /// The response status code, when known
    pub status_code: Option<u16>,
    /// The raw request body
    pub post_data: Option<&'a str>,
}

/// Decides whether `snapshot` falls under `pattern` and `filter`.
pub(crate) fn matches(pattern: &UrlPattern, filter: &Filter, snapshot: &RequestSnapshot<'_>) -> bool {
    pattern.matches(snapshot.url) && filter.matches(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot<'a>(headers: &'a Headers, post_data: Option<&'a str>) -> RequestSnapshot<'a> {
        RequestSnapshot {
            url: "http://test.com/foobar/test.html",
            method: "POST",
            response_headers: headers,
            status_code: Some(200),
            post_data,
        }
    }

    #[test]
    fn test_regex_matcher() {
        let matcher = Matcher::regex(r"^\d+$").unwrap();
        assert!(matcher.matches_value("1234"));
        assert!(!matcher.matches_value("12a4"));
        assert_eq!(Matcher::regex(r"^\d+$").unwrap(), matcher);
        assert_eq!("^\\d+$ (regex)", matcher.to_string());
    }

    #[test]
    fn test_invalid_regex_matcher_is_rejected() {
        let err = Matcher::regex("(unclosed").unwrap_err();
        assert_eq!(ErrorKind::InvalidMatcher, err.kind);
    }

    #[test]
    fn test_method_exact_ignores_case() {
        let headers = Headers::new();
        assert!(Filter::new().method("post").matches(&snapshot(&headers, None)));
        assert!(!Filter::new().method("put").matches(&snapshot(&headers, None)));
    }

    #[test]
    fn test_method_fn_sees_raw_method() {
        let headers = Headers::new();
        let filter = Filter::new().method_fn(|method| method == "POST");
        assert!(filter.matches(&snapshot(&headers, None)));
    }

    #[test]
    fn test_missing_header_matcher() {
        let headers: Headers = vec![("Content-Type", "text/xml")].into_iter().collect();
        assert!(Filter::new()
            .header("authorization", Matcher::Missing)
            .matches(&snapshot(&headers, None)));
        assert!(!Filter::new()
            .header("content-type", Matcher::Missing)
            .matches(&snapshot(&headers, None)));
        assert!(Filter::new()
            .header("content-type", Matcher::Any)
            .matches(&snapshot(&headers, None)));
    }

    #[test]
    fn test_unknown_status_does_not_match() {
        let headers = Headers::new();
        let mut snap = snapshot(&headers, None);
        snap.status_code = None;

        assert!(!Filter::new().status_code(200).matches(&snap));
        assert!(!Filter::new().status_code_fn(|_| true).matches(&snap));
        assert!(Filter::new().matches(&snap));
    }

    #[test]
    fn test_post_data_matchers() {
        let headers = Headers::new();
        let json = r#"{"foo":{"bar":"baz"},"other":1}"#;

        assert!(Filter::new()
            .post_data(Matcher::PartialJson(serde_json::json!({"foo": {"bar": "baz"}})))
            .matches(&snapshot(&headers, Some(json))));
        assert!(!Filter::new()
            .post_data(Matcher::Json(serde_json::json!({"foo": {"bar": "baz"}})))
            .matches(&snapshot(&headers, Some(json))));
        assert!(Filter::new()
            .post_data(Matcher::UrlEncoded("hello".into(), "good day".into()))
            .matches(&snapshot(&headers, Some("hello=good%20day&x=1"))));
        assert!(Filter::new()
            .post_data(Matcher::Missing)
            .matches(&snapshot(&headers, None)));
        assert!(!Filter::new()
            .post_data("foobar")
            .matches(&snapshot(&headers, None)));
    }

    #[test]
    fn test_post_data_predicate_sees_absent_body() {
        let headers = Headers::new();
        let filter = Filter::new().post_data_fn(|body| body.is_none());

        assert!(filter.matches(&snapshot(&headers, None)));
        assert!(!filter.matches(&snapshot(&headers, Some("x"))));
    }
}
