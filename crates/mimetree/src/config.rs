//! Decoder configuration.

use crate::error::{Error, Result};

/// Default line terminator.
pub const DEFAULT_CRLF: &str = "\r\n";

/// Default charset for header text that does not name one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Default maximum nesting depth for multipart and embedded messages.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for a single decode.
///
/// Fixed for the duration of a call and passed unchanged into every nested
/// decode, including embedded `message/rfc822` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[allow(clippy::struct_excessive_bools)] // Mirrors the independent decode switches
pub struct DecodeConfig {
    /// Store bodies on leaf parts.
    pub include_bodies: bool,
    /// Apply transfer-encoding decoding to stored bodies.
    pub decode_bodies: bool,
    /// Apply RFC 2047 decoding to header values and filenames.
    pub decode_headers: bool,
    /// Line terminator assumed throughout the message.
    pub crlf: String,
    /// Charset used for unlabelled 8-bit header text and as a fallback for
    /// unknown encoded-word charsets.
    pub default_charset: String,
    /// Maximum nesting depth. The root message is depth 0.
    pub max_depth: usize,
    /// Identifier given to the root part. `None` means `"0"`.
    pub root_mime_id: Option<String>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            include_bodies: true,
            decode_bodies: true,
            decode_headers: true,
            crlf: DEFAULT_CRLF.to_string(),
            default_charset: DEFAULT_CHARSET.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            root_mime_id: None,
        }
    }
}

impl DecodeConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> DecodeConfigBuilder {
        DecodeConfigBuilder::new()
    }

    /// Checks that the configuration can drive a decode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the line terminator is empty or
    /// the depth limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.crlf.is_empty() {
            return Err(Error::InvalidConfig(
                "line terminator must not be empty".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the root identifier, `"0"` unless overridden.
    #[must_use]
    pub fn root_id(&self) -> &str {
        self.root_mime_id.as_deref().unwrap_or("0")
    }
}

/// Builder for [`DecodeConfig`].
#[derive(Debug, Clone, Default)]
pub struct DecodeConfigBuilder {
    config: DecodeConfig,
}

impl DecodeConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bodies are stored.
    #[must_use]
    pub const fn include_bodies(mut self, include: bool) -> Self {
        self.config.include_bodies = include;
        self
    }

    /// Sets whether stored bodies are transfer-decoded.
    #[must_use]
    pub const fn decode_bodies(mut self, decode: bool) -> Self {
        self.config.decode_bodies = decode;
        self
    }

    /// Sets whether header values are RFC 2047 decoded.
    #[must_use]
    pub const fn decode_headers(mut self, decode: bool) -> Self {
        self.config.decode_headers = decode;
        self
    }

    /// Sets the line terminator.
    #[must_use]
    pub fn crlf(mut self, crlf: impl Into<String>) -> Self {
        self.config.crlf = crlf.into();
        self
    }

    /// Sets the fallback charset.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.config.default_charset = charset.into();
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Sets the root part identifier.
    #[must_use]
    pub fn root_mime_id(mut self, id: impl Into<String>) -> Self {
        self.config.root_mime_id = Some(id.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> DecodeConfig {
        self.config
    }
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
    fn test_defaults() {
        let config = DecodeConfig::default();
        assert!(config.include_bodies);
        assert!(config.decode_bodies);
        assert!(config.decode_headers);
        assert_eq!(config.crlf, "\r\n");
        assert_eq!(config.default_charset, "UTF-8");
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.root_id(), "0");
    }

    #[test]
    fn test_builder() {
        let config = DecodeConfig::builder()
            .include_bodies(false)
            .decode_bodies(false)
            .decode_headers(false)
            .crlf("\n")
            .default_charset("ISO-8859-1")
            .max_depth(8)
            .root_mime_id("1")
            .build();

        assert!(!config.include_bodies);
        assert!(!config.decode_bodies);
        assert!(!config.decode_headers);
        assert_eq!(config.crlf, "\n");
        assert_eq!(config.default_charset, "ISO-8859-1");
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.root_id(), "1");
    }

    #[test]
    fn test_validate() {
        assert!(DecodeConfig::default().validate().is_ok());

        let empty_crlf = DecodeConfig::builder().crlf("").build();
        assert!(matches!(
            empty_crlf.validate(),
            Err(Error::InvalidConfig(_))
        ));

        let zero_depth = DecodeConfig::builder().max_depth(0).build();
        assert!(matches!(
            zero_depth.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
