//! MIME content type handling.

use crate::param::{HeaderField, Parameters};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lower-cased.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lower-cased.
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Parameters,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: Parameters::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Creates a message/rfc822 content type.
    #[must_use]
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822")
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary")
    }

    /// Returns the `primary/secondary` form.
    #[must_use]
    pub fn mimetype(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is an embedded message.
    #[must_use]
    pub fn is_message_rfc822(&self) -> bool {
        self.main_type == "message" && self.sub_type == "rfc822"
    }

    /// Parses a bare `type/subtype` string.
    ///
    /// Returns `None` unless both halves are non-empty MIME tokens.
    #[must_use]
    pub fn from_mimetype(s: &str) -> Option<Self> {
        let (main, sub) = s.split_once('/')?;
        let (main, sub) = (main.trim(), sub.trim());
        if is_token(main) && is_token(sub) {
            Some(Self::new(main, sub))
        } else {
            None
        }
    }

    /// Parses a `Content-Type` header value.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// Returns `None` if the value does not start with a valid
    /// `type/subtype`.
    #[must_use]
    pub fn parse(s: &str, default_charset: &str) -> Option<Self> {
        Self::from_field(HeaderField::parse(s, default_charset))
    }

    /// Builds a content type from an already parsed header field.
    #[must_use]
    pub fn from_field(field: HeaderField) -> Option<Self> {
        let mut content_type = Self::from_mimetype(&field.value)?;
        content_type.parameters = field.parameters;
        Some(content_type)
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"+.-_!#$&^".contains(&b))
}
