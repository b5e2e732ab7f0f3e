use serde::{Deserialize, Serialize};
use std::fmt;

///
/// A single header as it travels over the wire: `{ "name": ..., "value": ... }`.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    /// The header field name, in its original case
    pub name: String,
    /// The header value
    pub value: String,
}

impl HeaderEntry {
    /// Creates a new entry.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

///
/// An ordered list of headers. Field names keep their original case, lookups ignore it.
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<HeaderEntry>);

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value of the `name` field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.value.as_str())
    }

    /// Returns every value of the `name` field.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.value.as_str())
            .collect()
    }

    /// Whether a field called `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a field, keeping any existing ones with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(HeaderEntry::new(name, value));
    }

    ///
    /// Sets a field. The first existing field with the same name (in any case) keeps its
    /// position and original name and takes the new value, any duplicates are dropped.
    /// A missing field is appended.
    ///
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .0
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
        {
            Some(pos) => {
                self.0[pos].value = value;
                let mut index = 0;
                self.0.retain(|entry| {
                    let keep = index <= pos || !entry.name.eq_ignore_ascii_case(name);
                    index += 1;
                    keep
                });
            }
            None => self.append(name, value),
        }
    }

    /// Removes every field called `name`.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|entry| !entry.name.eq_ignore_ascii_case(name));
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The content type of a response, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Headers(
            iter.into_iter()
                .map(|(name, value)| HeaderEntry::new(name, value))
                .collect(),
        )
    }
}

impl From<Vec<HeaderEntry>> for Headers {
    fn from(entries: Vec<HeaderEntry>) -> Self {
        Headers(entries)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Headers;

    #[test]
    fn test_get_ignores_case() {
        let headers: Headers = vec![("Content-Type", "text/xml")].into_iter().collect();

        assert_eq!(Some("text/xml"), headers.get("content-type"));
        assert_eq!(Some("text/xml"), headers.get("CONTENT-TYPE"));
        assert_eq!(None, headers.get("accept"));
    }

    #[test]
    fn test_set_keeps_position_and_original_name() {
        let mut headers: Headers = vec![("Location", "a"), ("Content-Type", "b"), ("location", "c")]
            .into_iter()
            .collect();

        headers.set("LOCATION", "z");

        let pairs: Vec<(&str, &str)> = headers.iter().collect();
        assert_eq!(vec![("Location", "z"), ("Content-Type", "b")], pairs);
    }

    #[test]
    fn test_set_appends_missing_field() {
        let mut headers = Headers::new();
        headers.set("added", "string");

        assert_eq!(1, headers.len());
        assert_eq!(Some("string"), headers.get("Added"));
    }

    #[test]
    fn test_remove_drops_all_duplicates() {
        let mut headers: Headers = vec![("x-a", "1"), ("X-A", "2"), ("x-b", "3")]
            .into_iter()
            .collect();

        headers.remove("x-a");

        assert_eq!(1, headers.len());
        assert!(!headers.contains("x-a"));
    }
}
