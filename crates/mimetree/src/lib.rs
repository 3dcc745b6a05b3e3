//! # mimetree
//!
//! Recursive MIME message decoder.
//!
//! Takes a raw RFC 822 / MIME message held in memory and produces an
//! immutable tree of [`MessagePart`]s: headers, content type, disposition,
//! transfer-decoded bodies and nested parts, each with a hierarchical
//! identifier (`"0"`, `"0.1"`, `"0.1.2"`, ...).
//!
//! ## Features
//!
//! - **Multipart recursion**: mixed, alternative, related, digest, signed,
//!   encrypted and any other `multipart/*` subtype
//! - **Embedded messages**: `message/rfc822` parts are decoded as messages
//!   of their own
//! - **Header decoding**: folded lines, RFC 2047 encoded-words, RFC 2231
//!   parameter continuations and charsets
//! - **Body decoding**: Base64, Quoted-Printable and uuencode
//! - **Permissive**: malformed content decodes best-effort; only structural
//!   problems (missing boundary, excessive nesting) are errors
//!
//! ## Quick Start
//!
//! ```
//! use mimetree::{DecodeConfig, Decoder};
//!
//! let raw = concat!(
//!     "Subject: =?UTF-8?Q?Hello=2C_World?=\r\n",
//!     "Content-Type: multipart/mixed; boundary=XYZ\r\n",
//!     "\r\n",
//!     "--XYZ\r\n",
//!     "Content-Type: text/plain\r\n",
//!     "\r\n",
//!     "Hi there\r\n",
//!     "--XYZ--\r\n",
//! );
//!
//! let decoder = Decoder::new(DecodeConfig::default())?;
//! let message = decoder.decode(raw.as_bytes())?;
//!
//! assert_eq!(message.header("subject"), Some("Hello, World"));
//! assert_eq!(message.parts()[0].mime_id(), "0.1");
//! assert_eq!(message.parts()[0].body(), Some(b"Hi there".as_slice()));
//! # Ok::<(), mimetree::Error>(())
//! ```
//!
//! ### Configuration
//!
//! ```
//! use mimetree::DecodeConfig;
//!
//! let config = DecodeConfig::builder()
//!     .include_bodies(false)
//!     .crlf("\n")
//!     .max_depth(16)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod content_type;
mod decoder;
mod error;
mod header;
mod param;
mod part;
mod split;

pub mod encoding;

pub use config::{DecodeConfig, DecodeConfigBuilder, DEFAULT_CHARSET, DEFAULT_CRLF, DEFAULT_MAX_DEPTH};
pub use content_type::ContentType;
pub use decoder::{Decoder, RawPart, decode};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::{HeaderValue, Headers, split_header_lines};
pub use param::{HeaderField, Parameters};
pub use part::{Iter, MessagePart};
pub use split::{split_boundary, split_header_body};
