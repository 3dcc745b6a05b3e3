//! Error types for MIME decoding.

/// Result type alias for MIME decoding.
pub type Result<T> = std::result::Result<T, Error>;

/// Structural decoding failures.
///
/// Malformed content (bad charsets, broken base64, unknown transfer
/// encodings, header lines without a colon) never produces an error; it is
/// decoded best-effort instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A multipart content type has no `boundary` parameter.
    #[error("Missing boundary in multipart content type: {content_type}")]
    MissingBoundary {
        /// The offending `primary/secondary` content type.
        content_type: String,
    },

    /// Nesting of multipart or embedded messages exceeded the configured limit.
    #[error("MIME nesting depth exceeded limit of {limit}")]
    DepthExceeded {
        /// The configured maximum depth.
        limit: usize,
    },

    /// The decoder configuration is unusable.
    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),
}
