//! MIME header handling.

/// Value stored under one header name.
///
/// A name seen once holds a single value; a second occurrence promotes it to
/// an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum HeaderValue {
    /// The header occurred once.
    Single(String),
    /// The header occurred more than once, in order of appearance.
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Returns the first value.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(value) => value,
            Self::Multiple(values) => values.first().map_or("", String::as_str),
        }
    }

    /// Returns all values in order of appearance.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// Returns the number of occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(values) => values.len(),
        }
    }

    /// Returns true if no value is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

/// Collection of email headers, keyed by lower-cased name in first-seen
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value, promoting an existing value to a list.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((name, HeaderValue::Single(value))),
        }
    }

    /// Gets the value stored for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over distinct header names and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Headers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Splits a header block into `(name, value)` pairs in order of appearance.
///
/// Continuation lines (starting with a space or tab) are joined to the
/// previous line, the folding terminator and first whitespace character
/// being replaced by a single space. Each line is split at its first colon;
/// exactly one leading space is removed from the value and trailing
/// whitespace is trimmed. Names keep their original case.
///
/// Lines without a colon are skipped.
#[must_use]
pub fn split_header_lines(block: &str, crlf: &str) -> Vec<(String, String)> {
    let mut logical: Vec<String> = Vec::new();

    for line in block.split(crlf) {
        let folded = line.starts_with(' ') || line.starts_with('\t');
        match logical.last_mut() {
            Some(previous) if folded => {
                previous.push(' ');
                previous.push_str(&line[1..]);
            }
            _ => logical.push(line.to_string()),
        }
    }

    let mut pairs = Vec::with_capacity(logical.len());
    for line in &logical {
        if line.trim().is_empty() {
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            tracing::debug!(line = line.trim(), "skipping header line without colon");
            continue;
        };

        let name = name.trim();
        if name.is_empty() {
            tracing::debug!(line = line.trim(), "skipping header line without name");
            continue;
        }

        let value = value.strip_prefix(' ').unwrap_or(value).trim_end();
        pairs.push((name.to_string(), value.to_string()));
    }

    pairs
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.first("Content-Type"), Some("text/plain"));
        assert_eq!(headers.first("content-type"), Some("text/plain")); // Case insensitive
        assert_eq!(
            headers.get("content-type"),
            Some(&HeaderValue::Single("text/plain".to_string()))
        );
    }

    #[test]
    fn test_headers_promote_to_list() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("received", "from b");
        headers.add("RECEIVED", "from c");

        assert_eq!(
            headers.get("received"),
            Some(&HeaderValue::Multiple(vec![
                "from a".to_string(),
                "from b".to_string(),
                "from c".to_string(),
            ]))
        );
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_preserve_order() {
        let mut headers = Headers::new();
        headers.add("X-B", "2");
        headers.add("X-A", "1");
        headers.add("x-b", "3");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x-b", "x-a"]);
    }

    #[test]
    fn test_header_value_accessors() {
        let single = HeaderValue::Single("one".to_string());
        assert_eq!(single.first(), "one");
        assert_eq!(single.len(), 1);

        let multiple = HeaderValue::Multiple(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(multiple.first(), "a");
        assert_eq!(multiple.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!multiple.is_empty());
    }

    #[test]
    fn test_split_header_lines() {
        let block = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            "\tcharset=utf-8"
        );

        let pairs = split_header_lines(block, "\r\n");
        assert_eq!(
            pairs,
            vec![
                ("From".to_string(), "sender@example.com".to_string()),
                ("Subject".to_string(), "Test Message".to_string()),
                ("Content-Type".to_string(), "text/plain; charset=utf-8".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_header_lines_folding_keeps_extra_whitespace() {
        let pairs = split_header_lines("Subject: a\r\n   b", "\r\n");
        assert_eq!(pairs[0].1, "a   b");
    }

    #[test]
    fn test_split_header_lines_trims_one_leading_space() {
        let pairs = split_header_lines("X-A:  two\r\nX-B:none", "\r\n");
        assert_eq!(pairs[0].1, " two");
        assert_eq!(pairs[1].1, "none");
    }

    #[test]
    fn test_split_header_lines_value_with_colon() {
        let pairs = split_header_lines("Date: Mon, 1 Jan 2024 10:00:00 +0000", "\r\n");
        assert_eq!(pairs[0].0, "Date");
        assert_eq!(pairs[0].1, "Mon, 1 Jan 2024 10:00:00 +0000");
    }

    #[test]
    fn test_split_header_lines_skips_line_without_colon() {
        let pairs = split_header_lines("Subject: hi\r\ngarbage line\r\nTo: x@y", "\r\n");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "Subject");
        assert_eq!(pairs[1].0, "To");
    }

    #[test]
    fn test_split_header_lines_leading_blank_line() {
        let pairs = split_header_lines("\r\nContent-Type: text/plain", "\r\n");
        assert_eq!(pairs, vec![("Content-Type".to_string(), "text/plain".to_string())]);
    }

    #[test]
    fn test_split_header_lines_empty() {
        assert!(split_header_lines("", "\r\n").is_empty());
    }

    #[test]
    fn test_split_header_lines_lf() {
        let pairs = split_header_lines("A: 1\n B\nC: 2", "\n");
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "1 B".to_string()),
                ("C".to_string(), "2".to_string()),
            ]
        );
    }
}
