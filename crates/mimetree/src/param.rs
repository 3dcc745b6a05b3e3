//! Structured header values: `primary; key=value; ...`.
//!
//! Used for `Content-Type`, `Content-Disposition` and
//! `Content-Transfer-Encoding`. Parameters may be quoted and may use
//! RFC 2231 continuations (`key*0*=`, `key*1=`) with a
//! `charset'language'` prefix.

use crate::encoding::{decode_charset, decode_rfc2047, percent_decode};
use std::collections::BTreeMap;

/// Header parameters, keyed by lower-cased name in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Merges `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: Self) {
        for (key, value) in other.entries {
            self.set(key, value);
        }
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Parameters {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A parsed structured header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderField {
    /// The value before the first `;`, trimmed.
    pub value: String,
    /// Parameters following the value.
    pub parameters: Parameters,
}

/// One RFC 2231 section: `(extended, raw value)`.
type Sections = BTreeMap<u32, (bool, String)>;

impl HeaderField {
    /// Parses `value; key=value; key*0*=...`.
    ///
    /// Semicolons inside quoted strings do not split. Segments without `=`
    /// are ignored. RFC 2231 sections are joined in index order and
    /// converted from their declared charset, or `default_charset` if none
    /// is declared; when both a plain and an RFC 2231 form of a key are
    /// present, the RFC 2231 form wins.
    #[must_use]
    pub fn parse(input: &str, default_charset: &str) -> Self {
        Self::parse_inner(input, default_charset, false)
    }

    /// Like [`HeaderField::parse`], but also decodes RFC 2047 encoded-words
    /// in plain parameter values.
    ///
    /// Words are decoded after the value has been split, so decoded text
    /// can never introduce quotes or separators. The `boundary` parameter
    /// is always kept verbatim.
    #[must_use]
    pub fn parse_decoded(input: &str, default_charset: &str) -> Self {
        Self::parse_inner(input, default_charset, true)
    }

    fn parse_inner(input: &str, default_charset: &str, decode_words: bool) -> Self {
        let mut segments = split_unquoted(input).into_iter();
        let value = segments.next().unwrap_or_default().trim().to_string();

        let mut parameters = Parameters::new();
        let mut continued: Vec<(String, Sections)> = Vec::new();

        for segment in segments {
            let Some((raw_key, raw_value)) = segment.split_once('=') else {
                continue;
            };
            let raw_key = raw_key.trim();
            if raw_key.is_empty() || raw_key.contains(|c: char| c.is_whitespace() || c == '"') {
                continue;
            }
            let raw_value = unquote(raw_value);

            match parse_key(raw_key) {
                ParamKey::Plain(key) => {
                    let key = key.to_ascii_lowercase();
                    if !continued.iter().any(|(k, _)| *k == key) {
                        let value = if decode_words && key != "boundary" {
                            decode_rfc2047(&raw_value, default_charset)
                        } else {
                            raw_value
                        };
                        parameters.set(key, value);
                    }
                }
                ParamKey::Section {
                    name,
                    index,
                    extended,
                } => {
                    let name = name.to_ascii_lowercase();
                    if let Some((_, sections)) = continued.iter_mut().find(|(k, _)| *k == name) {
                        sections.insert(index, (extended, raw_value));
                    } else {
                        // Reserve the parameter's position; filled in below.
                        parameters.set(name.clone(), String::new());
                        let mut sections = Sections::new();
                        sections.insert(index, (extended, raw_value));
                        continued.push((name, sections));
                    }
                }
            }
        }

        for (name, sections) in continued {
            parameters.set(name, join_sections(&sections, default_charset));
        }

        Self { value, parameters }
    }
}

enum ParamKey<'a> {
    Plain(&'a str),
    Section {
        name: &'a str,
        index: u32,
        extended: bool,
    },
}

/// Classifies `name`, `name*`, `name*N` and `name*N*`.
fn parse_key(key: &str) -> ParamKey<'_> {
    let Some((name, rest)) = key.split_once('*') else {
        return ParamKey::Plain(key);
    };
    if name.is_empty() {
        return ParamKey::Plain(key);
    }
    if rest.is_empty() {
        return ParamKey::Section {
            name,
            index: 0,
            extended: true,
        };
    }

    let (digits, extended) = rest
        .strip_suffix('*')
        .map_or((rest, false), |digits| (digits, true));
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return ParamKey::Plain(key);
    }

    digits.parse().map_or(ParamKey::Plain(key), |index| ParamKey::Section {
        name,
        index,
        extended,
    })
}

fn join_sections(sections: &Sections, default_charset: &str) -> String {
    let mut charset: Option<&str> = None;
    let mut bytes = Vec::new();

    for (position, (extended, raw)) in sections.values().enumerate() {
        if !*extended {
            bytes.extend_from_slice(raw.as_bytes());
            continue;
        }

        let mut text = raw.as_str();
        if position == 0 {
            if let Some((declared, rest)) = split_charset_prefix(text) {
                if !declared.is_empty() {
                    charset = Some(declared);
                }
                text = rest;
            }
        }
        bytes.extend(percent_decode(text));
    }

    decode_charset(&bytes, charset, default_charset)
}

/// Splits `charset'language'value`.
fn split_charset_prefix(text: &str) -> Option<(&str, &str)> {
    let (charset, rest) = text.split_once('\'')?;
    let (_language, value) = rest.split_once('\'')?;
    Some((charset, value))
}

/// Splits on `;` outside double quotes, honouring backslash escapes.
fn split_unquoted(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);

    segments
}

/// Trims a parameter value and removes surrounding quotes and escapes.
///
/// An unterminated quoted string runs to the end of the value.
fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    let Some(quoted) = raw.strip_prefix('"') else {
        return raw.to_string();
    };

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    value.push(next);
                }
            }
            '"' => break,
            c => value.push(c),
        }
    }

    value
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

    fn parse(input: &str) -> HeaderField {
        HeaderField::parse(input, "UTF-8")
    }

    #[test]
    fn test_parameters_set_get() {
        let mut params = Parameters::new();
        params.set("Charset", "utf-8");
        params.set("name", "a.txt");
        params.set("CHARSET", "iso-8859-1");

        assert_eq!(params.get("charset"), Some("iso-8859-1"));
        assert_eq!(params.len(), 2);
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["charset", "name"]);
    }

    #[test]
    fn test_parameters_merge() {
        let mut first = Parameters::new();
        first.set("charset", "us-ascii");
        first.set("format", "flowed");
        let mut second = Parameters::new();
        second.set("charset", "utf-8");
        second.set("delsp", "yes");

        first.merge(second);
        assert_eq!(first.get("charset"), Some("utf-8"));
        assert_eq!(first.get("format"), Some("flowed"));
        assert_eq!(first.get("delsp"), Some("yes"));
    }

    #[test]
    fn test_parse_value_only() {
        let field = parse("  multipart/mixed  ");
        assert_eq!(field.value, "multipart/mixed");
        assert!(field.parameters.is_empty());
    }

    #[test]
    fn test_parse_parameters() {
        let field = parse("text/plain; charset=utf-8; format=\"flowed\"");
        assert_eq!(field.value, "text/plain");
        assert_eq!(field.parameters.get("charset"), Some("utf-8"));
        assert_eq!(field.parameters.get("format"), Some("flowed"));
    }

    #[test]
    fn test_parse_keys_case_folded() {
        let field = parse("multipart/mixed; BOUNDARY=\"XyZ\"");
        assert_eq!(field.parameters.get("boundary"), Some("XyZ"));
    }

    #[test]
    fn test_parse_quoted_semicolon() {
        let field = parse("attachment; filename=\"a;b.txt\"; size=10");
        assert_eq!(field.value, "attachment");
        assert_eq!(field.parameters.get("filename"), Some("a;b.txt"));
        assert_eq!(field.parameters.get("size"), Some("10"));
    }

    #[test]
    fn test_parse_quoted_escapes() {
        let field = parse(r#"attachment; filename="say \"hi\".txt""#);
        assert_eq!(field.parameters.get("filename"), Some("say \"hi\".txt"));
    }

    #[test]
    fn test_parse_ignores_garbage() {
        let field = parse("text/plain; ; junk; =x; charset=utf-8");
        assert_eq!(field.parameters.len(), 1);
        assert_eq!(field.parameters.get("charset"), Some("utf-8"));
    }

    #[test]
    fn test_parse_hyphenated_key() {
        let field = parse("attachment; creation-date=\"Mon, 1 Jan 2024 10:00:00 +0000\"");
        assert_eq!(
            field.parameters.get("creation-date"),
            Some("Mon, 1 Jan 2024 10:00:00 +0000")
        );
    }

    #[test]
    fn test_parse_decoded_words_after_split() {
        let field = HeaderField::parse_decoded(
            "application/pdf; name=\"=?UTF-8?Q?a=22b.pdf?=\"; x=1",
            "UTF-8",
        );
        assert_eq!(field.parameters.get("name"), Some("a\"b.pdf"));
        assert_eq!(field.parameters.get("x"), Some("1"));

        let field = HeaderField::parse_decoded("attachment; filename==?UTF-8?Q?a=3Bb.pdf?=", "UTF-8");
        assert_eq!(field.parameters.get("filename"), Some("a;b.pdf"));
    }

    #[test]
    fn test_parse_decoded_keeps_boundary() {
        let field = HeaderField::parse_decoded("multipart/mixed; boundary=\"=?utf-8?q?abc?=\"", "UTF-8");
        assert_eq!(field.parameters.get("boundary"), Some("=?utf-8?q?abc?="));
    }

    #[test]
    fn test_parse_leaves_words_encoded() {
        let field = parse("attachment; filename=\"=?UTF-8?Q?a=22b.pdf?=\"");
        assert_eq!(field.parameters.get("filename"), Some("=?UTF-8?Q?a=22b.pdf?="));
    }

    #[test]
    fn test_rfc2231_continuation() {
        let field = parse("attachment; filename*0*=UTF-8''Caf%C3%A9; filename*1*=.pdf");
        assert_eq!(field.parameters.get("filename"), Some("Café.pdf"));
    }

    #[test]
    fn test_rfc2231_out_of_order_sections() {
        let field = parse("attachment; filename*1=\"two\"; filename*0=\"one-\"");
        assert_eq!(field.parameters.get("filename"), Some("one-two"));
    }

    #[test]
    fn test_rfc2231_literal_sections_not_percent_decoded() {
        let field = parse("attachment; name*0*=utf-8''100%25; name*1=\"%41\"");
        assert_eq!(field.parameters.get("name"), Some("100%%41"));
    }

    #[test]
    fn test_rfc2231_single_extended() {
        let field = parse("attachment; filename*=iso-8859-1'fr'caf%E9.txt");
        assert_eq!(field.parameters.get("filename"), Some("café.txt"));
    }

    #[test]
    fn test_rfc2231_without_charset_prefix() {
        let field = parse("attachment; filename*0*=%41%42; filename*1*=C");
        assert_eq!(field.parameters.get("filename"), Some("ABC"));
    }

    #[test]
    fn test_rfc2231_wins_over_plain() {
        let field = parse("attachment; filename=\"plain.pdf\"; filename*=UTF-8''fancy%20name.pdf");
        assert_eq!(field.parameters.get("filename"), Some("fancy name.pdf"));

        let field = parse("attachment; filename*=UTF-8''first.pdf; filename=\"second.pdf\"");
        assert_eq!(field.parameters.get("filename"), Some("first.pdf"));
    }

    #[test]
    fn test_rfc2231_keeps_position() {
        let field = parse("attachment; title*0=a; size=3; title*1=b");
        let keys: Vec<&str> = field.parameters.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["title", "size"]);
        assert_eq!(field.parameters.get("title"), Some("ab"));
    }

    #[test]
    fn test_parse_key_forms() {
        assert!(matches!(parse_key("name"), ParamKey::Plain("name")));
        assert!(matches!(
            parse_key("name*"),
            ParamKey::Section { name: "name", index: 0, extended: true }
        ));
        assert!(matches!(
            parse_key("name*2"),
            ParamKey::Section { name: "name", index: 2, extended: false }
        ));
        assert!(matches!(
            parse_key("name*3*"),
            ParamKey::Section { name: "name", index: 3, extended: true }
        ));
        assert!(matches!(parse_key("name*x"), ParamKey::Plain("name*x")));
    }
}
