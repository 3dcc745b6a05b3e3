//! The decoded message tree.

use crate::config::DecodeConfig;
use crate::decoder::RawPart;
use crate::encoding::{TransferEncoding, decode_rfc2047};
use crate::header::Headers;
use crate::param::Parameters;

/// One node of a decoded message.
///
/// Built once by [`MessagePart::from_raw`] and immutable afterwards. A child's
/// identifier is its parent's identifier followed by `.` and its 1-based
/// position among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MessagePart {
    mime_id: String,
    headers: Headers,
    mimetype: String,
    ctype_primary: String,
    ctype_secondary: String,
    ctype_parameters: Parameters,
    disposition: Option<String>,
    d_parameters: Parameters,
    encoding: Option<String>,
    charset: Option<String>,
    filename: Option<String>,
    body: Option<Vec<u8>>,
    size: usize,
    parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Converts an intermediate structure into the final tree.
    ///
    /// Identifiers are assigned depth-first starting from the configured
    /// root identifier. The filename is taken from the disposition
    /// `filename` parameter, else the content-type `name` parameter, and is
    /// RFC 2047 decoded here when header decoding was switched off.
    #[must_use]
    pub fn from_raw(raw: RawPart, config: &DecodeConfig) -> Self {
        Self::normalize(raw, config.root_id().to_string(), config)
    }

    fn normalize(raw: RawPart, mime_id: String, config: &DecodeConfig) -> Self {
        let filename = raw
            .disposition_parameters
            .get("filename")
            .filter(|name| !name.is_empty())
            .or_else(|| raw.content_type.parameters.get("name").filter(|name| !name.is_empty()))
            .map(|name| {
                if config.decode_headers {
                    name.to_string()
                } else {
                    decode_rfc2047(name, &config.default_charset)
                }
            });

        let charset = raw
            .content_type
            .charset()
            .filter(|charset| !charset.is_empty())
            .map(str::to_string);

        let size = raw.body.as_ref().map_or(0, Vec::len);

        let parts = raw
            .parts
            .into_iter()
            .enumerate()
            .map(|(index, child)| {
                let child_id = format!("{mime_id}.{}", index + 1);
                Self::normalize(child, child_id, config)
            })
            .collect();

        Self {
            mime_id,
            headers: raw.headers,
            mimetype: raw.content_type.mimetype(),
            ctype_primary: raw.content_type.main_type,
            ctype_secondary: raw.content_type.sub_type,
            ctype_parameters: raw.content_type.parameters,
            disposition: raw.disposition,
            d_parameters: raw.disposition_parameters,
            encoding: raw.encoding,
            charset,
            filename,
            body: raw.body,
            size,
            parts,
        }
    }

    /// Returns the hierarchical part identifier.
    #[must_use]
    pub fn mime_id(&self) -> &str {
        &self.mime_id
    }

    /// Returns the part headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets the first value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    /// Returns `primary/secondary`.
    #[must_use]
    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Returns the primary content type.
    #[must_use]
    pub fn ctype_primary(&self) -> &str {
        &self.ctype_primary
    }

    /// Returns the content subtype.
    #[must_use]
    pub fn ctype_secondary(&self) -> &str {
        &self.ctype_secondary
    }

    /// Returns the content-type parameters.
    #[must_use]
    pub const fn ctype_parameters(&self) -> &Parameters {
        &self.ctype_parameters
    }

    /// Returns the lower-cased disposition, if any.
    #[must_use]
    pub fn disposition(&self) -> Option<&str> {
        self.disposition.as_deref()
    }

    /// Returns the disposition parameters.
    #[must_use]
    pub const fn d_parameters(&self) -> &Parameters {
        &self.d_parameters
    }

    /// Returns the `Content-Transfer-Encoding` value as given.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Returns the transfer encoding, `7bit` when absent.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.encoding
            .as_deref()
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the content-type charset, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Returns the resolved filename, if any.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the stored body.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Returns the byte length of the stored body, 0 without one.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the child parts.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        &self.parts
    }

    /// Checks if this is a multipart part.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.ctype_primary == "multipart"
    }

    /// Finds a part by identifier anywhere in this subtree.
    #[must_use]
    pub fn find(&self, mime_id: &str) -> Option<&Self> {
        self.iter().find(|part| part.mime_id == mime_id)
    }

    /// Iterates over this part and all descendants, depth-first.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Iterates over leaf parts that carry a filename or an `attachment`
    /// disposition.
    pub fn attachments(&self) -> impl Iterator<Item = &Self> {
        self.iter().filter(|part| {
            part.parts.is_empty()
                && (part.filename.is_some() || part.disposition.as_deref() == Some("attachment"))
        })
    }
}

impl<'a> IntoIterator for &'a MessagePart {
    type Item = &'a MessagePart;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Depth-first iterator over a part tree.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a MessagePart>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a MessagePart;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        self.stack.extend(part.parts.iter().rev());
        Some(part)
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
    use crate::content_type::ContentType;

    fn leaf(main: &str, sub: &str, body: &[u8]) -> RawPart {
        RawPart {
            headers: Headers::new(),
            content_type: ContentType::new(main, sub),
            disposition: None,
            disposition_parameters: Parameters::new(),
            encoding: None,
            body: Some(body.to_vec()),
            parts: Vec::new(),
        }
    }

    fn container(children: Vec<RawPart>) -> RawPart {
        let mut part = leaf("multipart", "mixed", b"");
        part.body = None;
        part.parts = children;
        part
    }

    #[test]
    fn test_ids_depth_first() {
        let raw = container(vec![
            container(vec![leaf("text", "plain", b"a"), leaf("text", "html", b"b")]),
            leaf("image", "png", b"c"),
        ]);
        let tree = MessagePart::from_raw(raw, &DecodeConfig::default());

        let ids: Vec<&str> = tree.iter().map(MessagePart::mime_id).collect();
        assert_eq!(ids, vec!["0", "0.1", "0.1.1", "0.1.2", "0.2"]);
        assert_eq!(tree.find("0.1.2").unwrap().mimetype(), "text/html");
        assert!(tree.find("0.3").is_none());
    }

    #[test]
    fn test_root_id_override() {
        let raw = container(vec![leaf("text", "plain", b"a")]);
        let config = DecodeConfig::builder().root_mime_id("2").build();
        let tree = MessagePart::from_raw(raw, &config);

        assert_eq!(tree.mime_id(), "2");
        assert_eq!(tree.parts()[0].mime_id(), "2.1");
    }

    #[test]
    fn test_size_matches_body() {
        let tree = MessagePart::from_raw(leaf("text", "plain", b"hello"), &DecodeConfig::default());
        assert_eq!(tree.size(), 5);

        let tree = MessagePart::from_raw(container(Vec::new()), &DecodeConfig::default());
        assert_eq!(tree.size(), 0);
        assert!(tree.body().is_none());
    }

    #[test]
    fn test_filename_prefers_disposition() {
        let mut raw = leaf("application", "pdf", b"");
        raw.content_type.parameters.set("name", "ctype.pdf");
        raw.disposition_parameters.set("filename", "disp.pdf");
        let tree = MessagePart::from_raw(raw, &DecodeConfig::default());
        assert_eq!(tree.filename(), Some("disp.pdf"));

        let mut raw = leaf("application", "pdf", b"");
        raw.content_type.parameters.set("name", "ctype.pdf");
        raw.disposition_parameters.set("filename", "");
        let tree = MessagePart::from_raw(raw, &DecodeConfig::default());
        assert_eq!(tree.filename(), Some("ctype.pdf"));
    }

    #[test]
    fn test_filename_decoded_when_headers_raw() {
        let mut raw = leaf("application", "pdf", b"");
        raw.disposition_parameters.set("filename", "=?UTF-8?Q?r=C3=A9sum=C3=A9.pdf?=");

        let raw_config = DecodeConfig::builder().decode_headers(false).build();
        let tree = MessagePart::from_raw(raw.clone(), &raw_config);
        assert_eq!(tree.filename(), Some("résumé.pdf"));

        // Already decoded at header level: left as is.
        let tree = MessagePart::from_raw(raw, &DecodeConfig::default());
        assert_eq!(tree.filename(), Some("=?UTF-8?Q?r=C3=A9sum=C3=A9.pdf?="));
    }

    #[test]
    fn test_charset_and_attachments() {
        let mut text = leaf("text", "plain", b"hi");
        text.content_type.parameters.set("charset", "utf-8");
        let mut attachment = leaf("application", "zip", b"PK");
        attachment.disposition = Some("attachment".to_string());

        let tree = MessagePart::from_raw(container(vec![text, attachment]), &DecodeConfig::default());
        assert_eq!(tree.parts()[0].charset(), Some("utf-8"));
        assert!(tree.is_multipart());

        let attachments: Vec<&str> = tree.attachments().map(MessagePart::mime_id).collect();
        assert_eq!(attachments, vec!["0.2"]);
    }
}
