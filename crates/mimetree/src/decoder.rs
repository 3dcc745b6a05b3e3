//! Recursive MIME part decoding.

use crate::config::DecodeConfig;
use crate::content_type::ContentType;
use crate::encoding::{TransferEncoding, decode_header_bytes, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::{Headers, split_header_lines};
use crate::param::{HeaderField, Parameters};
use crate::part::MessagePart;
use crate::split::{split_boundary, split_header_body};

/// A decoded part before identifiers are assigned.
///
/// Produced by [`Decoder::decode_structure`]; turned into the final tree by
/// [`MessagePart::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    /// Headers in first-seen order.
    pub headers: Headers,
    /// Effective content type (the caller default when the header is absent
    /// or unparseable).
    pub content_type: ContentType,
    /// Lower-cased `Content-Disposition` value.
    pub disposition: Option<String>,
    /// `Content-Disposition` parameters.
    pub disposition_parameters: Parameters,
    /// `Content-Transfer-Encoding` value as given.
    pub encoding: Option<String>,
    /// Stored body, when bodies are included.
    pub body: Option<Vec<u8>>,
    /// Child parts in order.
    pub parts: Vec<Self>,
}

impl RawPart {
    /// Returns the transfer encoding, `7bit` when absent.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.encoding
            .as_deref()
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }
}

/// Accumulates header-derived fields for one part.
///
/// Consumed by [`PartBuilder::finish`], so a part is only ever observed
/// complete.
#[derive(Debug, Default)]
struct PartBuilder {
    headers: Headers,
    content_type: Option<ContentType>,
    disposition: Option<String>,
    disposition_parameters: Parameters,
    encoding: Option<String>,
}

impl PartBuilder {
    fn from_header_block(block: &[u8], config: &DecodeConfig) -> Self {
        let text = decode_header_bytes(block, &config.default_charset);
        let mut builder = Self::default();

        for (name, value) in split_header_lines(&text, &config.crlf) {
            builder.add_header(name, value, config);
        }

        builder
    }

    /// Records one header.
    ///
    /// Structured fields are parsed from the raw value so that decoded
    /// encoded-words cannot alter their syntax; only the stored value is
    /// decoded as a whole.
    fn add_header(&mut self, name: String, raw: String, config: &DecodeConfig) {
        let charset = config.default_charset.as_str();
        let parse_field = |value: &str| {
            if config.decode_headers {
                HeaderField::parse_decoded(value, charset)
            } else {
                HeaderField::parse(value, charset)
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "content-type" => match ContentType::from_field(parse_field(&raw)) {
                // A repeated Content-Type overrides the type and merges parameters.
                Some(parsed) => match self.content_type.as_mut() {
                    Some(existing) => {
                        existing.main_type = parsed.main_type;
                        existing.sub_type = parsed.sub_type;
                        existing.parameters.merge(parsed.parameters);
                    }
                    None => self.content_type = Some(parsed),
                },
                None => tracing::debug!(value = %raw, "ignoring unparseable content type"),
            },
            "content-disposition" => {
                let field = parse_field(&raw);
                if !field.value.is_empty() {
                    self.disposition = Some(field.value.to_ascii_lowercase());
                }
                self.disposition_parameters.merge(field.parameters);
            }
            "content-transfer-encoding" => {
                let value = raw.trim();
                if !value.is_empty() {
                    self.encoding = Some(value.to_string());
                }
            }
            _ => {}
        }

        let value = if config.decode_headers {
            decode_rfc2047(&raw, charset)
        } else {
            raw
        };
        self.headers.add(name, value);
    }

    fn transfer_encoding(&self) -> TransferEncoding {
        self.encoding
            .as_deref()
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    fn finish(self, content_type: ContentType, body: Option<Vec<u8>>, parts: Vec<RawPart>) -> RawPart {
        RawPart {
            headers: self.headers,
            content_type,
            disposition: self.disposition,
            disposition_parameters: self.disposition_parameters,
            encoding: self.encoding,
            body,
            parts,
        }
    }
}

/// MIME message decoder.
///
/// Holds a validated [`DecodeConfig`]; decoding is a pure function of the
/// input bytes and that configuration, so one decoder can be shared freely.
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecodeConfig,
}

impl Decoder {
    /// Creates a decoder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn new(config: DecodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decodes a raw message into a part tree with identifiers assigned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBoundary`] if any multipart part lacks a
    /// boundary, or [`Error::DepthExceeded`] if nesting is too deep.
    pub fn decode(&self, raw: &[u8]) -> Result<MessagePart> {
        let structure = self.decode_structure(raw)?;
        Ok(MessagePart::from_raw(structure, &self.config))
    }

    /// Decodes a raw message into the intermediate structure, without
    /// assigning identifiers.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::decode`].
    pub fn decode_structure(&self, raw: &[u8]) -> Result<RawPart> {
        self.decode_message(raw, 0).inspect_err(|e| {
            tracing::warn!(error = %e, len = raw.len(), "MIME decode failed");
        })
    }

    fn decode_message(&self, input: &[u8], depth: usize) -> Result<RawPart> {
        let (header, body) = split_header_body(input, self.config.crlf.as_bytes());
        self.decode_part(header, body, &ContentType::text_plain(), depth)
    }

    fn decode_part(
        &self,
        header: &[u8],
        body: &[u8],
        default_type: &ContentType,
        depth: usize,
    ) -> Result<RawPart> {
        if depth > self.config.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        let builder = PartBuilder::from_header_block(header, &self.config);
        let content_type = builder
            .content_type
            .clone()
            .unwrap_or_else(|| default_type.clone());
        let transfer = builder.transfer_encoding();

        tracing::trace!(
            depth,
            content_type = %content_type.mimetype(),
            transfer = %transfer,
            body_len = body.len(),
            "decoding part"
        );

        if content_type.is_multipart() {
            let parts = self.decode_multipart(&content_type, body, depth)?;
            return Ok(builder.finish(content_type, None, parts));
        }

        if content_type.is_message_rfc822() {
            let decoded = transfer.decode(body);
            let embedded = self.decode_message(&decoded, depth + 1)?;
            let stored = self.config.include_bodies.then(|| {
                if self.config.decode_bodies {
                    decoded
                } else {
                    body.to_vec()
                }
            });
            return Ok(builder.finish(content_type, stored, vec![embedded]));
        }

        let stored = self.config.include_bodies.then(|| {
            if self.config.decode_bodies {
                transfer.decode(body)
            } else {
                body.to_vec()
            }
        });
        Ok(builder.finish(content_type, stored, Vec::new()))
    }

    fn decode_multipart(
        &self,
        content_type: &ContentType,
        body: &[u8],
        depth: usize,
    ) -> Result<Vec<RawPart>> {
        let Some(boundary) = content_type.boundary().filter(|b| !b.is_empty()) else {
            return Err(Error::MissingBoundary {
                content_type: content_type.mimetype(),
            });
        };

        let child_default = if content_type.sub_type == "digest" {
            ContentType::message_rfc822()
        } else {
            ContentType::text_plain()
        };

        let crlf = self.config.crlf.as_bytes();
        let segments = split_boundary(body, boundary, crlf);
        tracing::debug!(boundary, parts = segments.len(), depth, "split multipart body");

        segments
            .into_iter()
            .map(|segment| {
                let (header, body) = split_header_body(segment, crlf);
                self.decode_part(header, body, &child_default, depth + 1)
            })
            .collect()
    }
}

/// Decodes a raw message with the given configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an unusable configuration, and
/// otherwise the errors of [`Decoder::decode`].
pub fn decode(raw: &[u8], config: &DecodeConfig) -> Result<MessagePart> {
    Decoder::new(config.clone())?.decode(raw)
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

    fn structure(raw: &str) -> RawPart {
        Decoder::new(DecodeConfig::default())
            .unwrap()
            .decode_structure(raw.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_decoder_rejects_invalid_config() {
        let config = DecodeConfig::builder().crlf("").build();
        assert!(matches!(Decoder::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_single_part_structure() {
        let part = structure("Subject: Hi\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<p>x</p>");
        assert_eq!(part.content_type.mimetype(), "text/html");
        assert_eq!(part.content_type.charset(), Some("utf-8"));
        assert_eq!(part.body.as_deref(), Some(b"<p>x</p>".as_slice()));
        assert!(part.parts.is_empty());
    }

    #[test]
    fn test_default_content_type() {
        let part = structure("Subject: Hi\r\n\r\nbody");
        assert_eq!(part.content_type, ContentType::text_plain());
    }

    #[test]
    fn test_unparseable_content_type_uses_default() {
        let part = structure("Content-Type: garbage\r\n\r\nbody");
        assert_eq!(part.content_type.mimetype(), "text/plain");
        assert_eq!(part.headers.first("content-type"), Some("garbage"));
    }

    #[test]
    fn test_repeated_content_type_merges_parameters() {
        let part = structure(concat!(
            "Content-Type: text/plain; charset=us-ascii; format=flowed\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "x"
        ));
        assert_eq!(part.content_type.mimetype(), "text/html");
        assert_eq!(part.content_type.charset(), Some("utf-8"));
        assert_eq!(part.content_type.parameters.get("format"), Some("flowed"));
    }

    #[test]
    fn test_transfer_encoding_recorded() {
        let part = structure("Content-Transfer-Encoding: Base64\r\n\r\naGk=");
        assert_eq!(part.encoding.as_deref(), Some("Base64"));
        assert_eq!(part.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(part.body.as_deref(), Some(b"hi".as_slice()));
    }

    #[test]
    fn test_transfer_encoding_keeps_raw_value() {
        let part = structure("Content-Transfer-Encoding:  base64; x-note=1 \r\n\r\naGk=");
        assert_eq!(part.encoding.as_deref(), Some("base64; x-note=1"));
        assert_eq!(part.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(part.body.as_deref(), Some(b"hi".as_slice()));
    }

    #[test]
    fn test_encoded_words_do_not_change_parameter_syntax() {
        let part = structure(concat!(
            "Content-Type: application/pdf; name=\"=?UTF-8?Q?a=22b.pdf?=\"\r\n",
            "Content-Disposition: attachment; filename==?UTF-8?Q?a=3Bb.pdf?=\r\n",
            "\r\n",
            "x"
        ));
        assert_eq!(part.content_type.parameters.get("name"), Some("a\"b.pdf"));
        assert_eq!(part.disposition_parameters.get("filename"), Some("a;b.pdf"));
        assert_eq!(
            part.headers.first("content-type"),
            Some("application/pdf; name=\"a\"b.pdf\"")
        );
    }

    #[test]
    fn test_empty_boundary_is_missing() {
        let decoder = Decoder::new(DecodeConfig::default()).unwrap();
        let result = decoder.decode_structure(b"Content-Type: multipart/mixed; boundary=\"\"\r\n\r\n--\r\n\r\na\r\n----\r\n");
        assert_eq!(
            result,
            Err(Error::MissingBoundary {
                content_type: "multipart/mixed".to_string()
            })
        );
    }

    #[test]
    fn test_disposition() {
        let part = structure(concat!(
            "Content-Type: application/pdf; name=\"c.pdf\"\r\n",
            "Content-Disposition: Attachment; filename=\"report.pdf\"\r\n",
            "\r\n",
            "%PDF"
        ));
        assert_eq!(part.disposition.as_deref(), Some("attachment"));
        assert_eq!(part.disposition_parameters.get("filename"), Some("report.pdf"));
        assert_eq!(part.content_type.parameters.get("name"), Some("c.pdf"));
    }

    #[test]
    fn test_multipart_children_use_default_type() {
        let part = structure(concat!(
            "Content-Type: multipart/mixed; boundary=XX\r\n",
            "\r\n",
            "--XX\r\n",
            "\r\n",
            "no headers\r\n",
            "--XX--\r\n"
        ));
        assert_eq!(part.parts.len(), 1);
        assert_eq!(part.parts[0].content_type.mimetype(), "text/plain");
        assert_eq!(part.parts[0].body.as_deref(), Some(b"no headers".as_slice()));
        assert!(part.body.is_none());
    }

    #[test]
    fn test_digest_children_default_to_message() {
        let part = structure(concat!(
            "Content-Type: multipart/digest; boundary=D\r\n",
            "\r\n",
            "--D\r\n",
            "\r\n",
            "Subject: inner\r\n",
            "\r\n",
            "inner body\r\n",
            "--D--\r\n"
        ));
        let child = &part.parts[0];
        assert!(child.content_type.is_message_rfc822());
        assert_eq!(child.parts.len(), 1);
        assert_eq!(child.parts[0].headers.first("subject"), Some("inner"));
        assert_eq!(child.parts[0].body.as_deref(), Some(b"inner body".as_slice()));
    }

    #[test]
    fn test_unlisted_multipart_subtype_recurses() {
        let part = structure(concat!(
            "Content-Type: multipart/report; report-type=delivery-status; boundary=R\r\n",
            "\r\n",
            "--R\r\n",
            "\r\n",
            "one\r\n",
            "--R\r\n",
            "Content-Type: message/delivery-status\r\n",
            "\r\n",
            "Status: 5.0.0\r\n",
            "--R--\r\n"
        ));
        assert_eq!(part.parts.len(), 2);
        assert_eq!(part.parts[1].content_type.mimetype(), "message/delivery-status");
        assert!(part.parts[1].parts.is_empty());
    }

    #[test]
    fn test_missing_boundary_in_nested_part_fails_whole_decode() {
        let decoder = Decoder::new(DecodeConfig::default()).unwrap();
        let result = decoder.decode_structure(
            concat!(
                "Content-Type: multipart/mixed; boundary=OUT\r\n",
                "\r\n",
                "--OUT\r\n",
                "Content-Type: multipart/alternative\r\n",
                "\r\n",
                "x\r\n",
                "--OUT--\r\n"
            )
            .as_bytes(),
        );
        assert_eq!(
            result,
            Err(Error::MissingBoundary {
                content_type: "multipart/alternative".to_string()
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let config = DecodeConfig::builder().max_depth(1).build();
        let decoder = Decoder::new(config).unwrap();

        let shallow = concat!(
            "Content-Type: multipart/mixed; boundary=A\r\n",
            "\r\n",
            "--A\r\n",
            "\r\n",
            "leaf\r\n",
            "--A--\r\n"
        );
        assert!(decoder.decode_structure(shallow.as_bytes()).is_ok());

        let deep = concat!(
            "Content-Type: multipart/mixed; boundary=A\r\n",
            "\r\n",
            "--A\r\n",
            "Content-Type: multipart/mixed; boundary=B\r\n",
            "\r\n",
            "--B\r\n",
            "\r\n",
            "leaf\r\n",
            "--B--\r\n",
            "--A--\r\n"
        );
        assert_eq!(
            decoder.decode_structure(deep.as_bytes()),
            Err(Error::DepthExceeded { limit: 1 })
        );
    }

    #[test]
    fn test_message_rfc822_base64_embedded() {
        // "Subject: x\r\n\r\nhello" in base64
        let part = structure(concat!(
            "Content-Type: message/rfc822\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "U3ViamVjdDogeA0KDQpoZWxsbw=="
        ));
        assert_eq!(part.parts.len(), 1);
        assert_eq!(part.parts[0].headers.first("subject"), Some("x"));
        assert_eq!(part.parts[0].body.as_deref(), Some(b"hello".as_slice()));
        assert_eq!(part.body.as_deref(), Some(b"Subject: x\r\n\r\nhello".as_slice()));
    }

    #[test]
    fn test_free_decode_function() {
        let tree = decode(b"Subject: a\r\n\r\nb", &DecodeConfig::default()).unwrap();
        assert_eq!(tree.mime_id(), "0");
        assert_eq!(tree.body(), Some(b"b".as_slice()));
    }
}
