//! Transfer-encoding, RFC 2047 and charset decoding.
//!
//! Every decoder here is permissive: malformed input produces best-effort
//! output instead of an error, as mail readers conventionally do.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;
use std::fmt;

/// Base64 engine that accepts missing padding and non-zero trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Binary (no encoding).
    Binary,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Unix-to-Unix encoding (`x-uuencode` and its aliases).
    UuEncode,
}

impl TransferEncoding {
    /// Parses transfer encoding from a `Content-Transfer-Encoding` token.
    ///
    /// Only the token before any `;` is considered. Unknown tokens map to
    /// [`TransferEncoding::SevenBit`], which leaves the body untouched.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let token = s.split_once(';').map_or(s, |(token, _)| token);
        match token.trim().to_ascii_lowercase().as_str() {
            "7bit" | "" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "x-uuencode" | "x-uue" | "uue" | "uuencode" => Self::UuEncode,
            other => {
                tracing::debug!(encoding = other, "unknown transfer encoding, passing through");
                Self::SevenBit
            }
        }
    }

    /// Decodes `data` according to this encoding.
    #[must_use]
    pub fn decode(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => decode_base64(data),
            Self::QuotedPrintable => decode_quoted_printable(data),
            Self::UuEncode => decode_uuencode(data),
            Self::SevenBit | Self::EightBit | Self::Binary => data.to_vec(),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Binary => write!(f, "binary"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::UuEncode => write!(f, "x-uuencode"),
        }
    }
}

/// Decodes Base64 data, skipping whitespace and any non-alphabet bytes.
#[must_use]
pub fn decode_base64(data: &[u8]) -> Vec<u8> {
    let mut cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();

    // A lone trailing sextet cannot form a byte.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT_BASE64.decode(&cleaned).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "undecodable base64 data");
        Vec::new()
    })
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks (`=` at end of line, CRLF or bare LF) are removed.
/// Escapes that are not followed by two hex digits are kept literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break, allowing trailing whitespace after the '='
        let mut j = i + 1;
        while j < data.len() && (data[j] == b' ' || data[j] == b'\t') {
            j += 1;
        }
        if data[j..].starts_with(b"\r\n") {
            i = j + 2;
            continue;
        }
        if data[j..].starts_with(b"\n") {
            i = j + 1;
            continue;
        }

        match (hex_value(data.get(i + 1)), hex_value(data.get(i + 2))) {
            (Some(high), Some(low)) => {
                result.push((high << 4) | low);
                i += 3;
            }
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

/// Decodes uuencoded data.
///
/// A leading `begin <mode> <name>` line and the trailing `end` line are
/// optional.
#[must_use]
pub fn decode_uuencode(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::new();

    for line in data.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() || line.starts_with(b"begin ") {
            continue;
        }
        if line == b"end" {
            break;
        }

        let len = usize::from(uu_value(line[0]));
        if len == 0 {
            continue;
        }

        let mut decoded = Vec::with_capacity(len + 2);
        for chunk in line[1..].chunks(4) {
            let mut v = [0u8; 4];
            for (slot, &c) in v.iter_mut().zip(chunk) {
                *slot = uu_value(c);
            }
            decoded.push((v[0] << 2) | (v[1] >> 4));
            decoded.push((v[1] << 4) | (v[2] >> 2));
            decoded.push((v[2] << 6) | v[3]);
        }
        decoded.truncate(len);
        result.extend_from_slice(&decoded);
    }

    result
}

const fn uu_value(c: u8) -> u8 {
    c.wrapping_sub(b' ') & 0x3f
}

/// Decodes `%XX` escapes (RFC 2231 extended values). Invalid escapes are
/// kept literally.
#[must_use]
pub fn percent_decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(high), Some(low)) = (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                result.push((high << 4) | low);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }

    result
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    match *byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolves a charset label, ignoring an RFC 2231 `*language` suffix.
fn lookup_charset(label: &str) -> Option<&'static Encoding> {
    let label = label.split('*').next().unwrap_or(label).trim();
    Encoding::for_label_no_replacement(label.as_bytes())
}

/// Converts `bytes` in `charset` to a string.
///
/// Without a recognised charset, valid UTF-8 is taken as is and anything
/// else is read as `default_charset` (Windows-1252 if that label is unknown
/// or is UTF-8 itself).
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>, default_charset: &str) -> String {
    if let Some(encoding) = charset.and_then(lookup_charset) {
        return encoding.decode_with_bom_removal(bytes).0.into_owned();
    }
    if let Some(label) = charset {
        tracing::debug!(charset = label, "unknown charset, using fallback");
    }
    decode_unlabelled(bytes, default_charset)
}

/// Converts raw header bytes to a string.
///
/// Valid UTF-8 is used as is; other 8-bit text is read as
/// `default_charset`, or Windows-1252 if that label is unknown.
#[must_use]
pub fn decode_header_bytes(bytes: &[u8], default_charset: &str) -> String {
    decode_unlabelled(bytes, default_charset)
}

fn decode_unlabelled(bytes: &[u8], default_charset: &str) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let encoding = lookup_charset(default_charset)
        .filter(|e| *e != encoding_rs::UTF_8)
        .unwrap_or(encoding_rs::WINDOWS_1252);
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// A run of header text: literal text or one decoded encoded-word.
enum Segment<'a> {
    Text(&'a str),
    Word { charset: &'a str, bytes: Vec<u8> },
}

/// Decodes RFC 2047 encoded-words (`=?charset?Q|B?data?=`) in a header value.
///
/// Text outside encoded-words is left untouched. Whitespace between two
/// adjacent encoded-words is dropped, and adjacent words sharing a charset
/// are joined before charset conversion so that multi-byte characters
/// split across words survive. Text that merely looks like the start of an
/// encoded-word is kept as is.
#[must_use]
pub fn decode_rfc2047(text: &str, default_charset: &str) -> String {
    if !text.contains("=?") {
        return text.to_string();
    }

    let segments = tokenize_encoded_words(text);
    let mut result = String::with_capacity(text.len());
    let mut pending: Option<(&str, Vec<u8>)> = None;

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Text(literal) => {
                let between_words = index > 0
                    && matches!(segments[index - 1], Segment::Word { .. })
                    && matches!(segments.get(index + 1), Some(Segment::Word { .. }));
                if between_words && literal.trim().is_empty() {
                    continue;
                }
                flush_word(&mut result, pending.take(), default_charset);
                result.push_str(literal);
            }
            Segment::Word { charset, bytes } => {
                let same_charset = pending
                    .as_ref()
                    .is_some_and(|(current, _)| current.eq_ignore_ascii_case(charset));
                if same_charset {
                    if let Some((_, buffer)) = pending.as_mut() {
                        buffer.extend_from_slice(bytes);
                    }
                } else {
                    flush_word(&mut result, pending.take(), default_charset);
                    pending = Some((*charset, bytes.clone()));
                }
            }
        }
    }
    flush_word(&mut result, pending, default_charset);

    result
}

fn flush_word(result: &mut String, word: Option<(&str, Vec<u8>)>, default_charset: &str) {
    if let Some((charset, bytes)) = word {
        result.push_str(&decode_charset(&bytes, Some(charset), default_charset));
    }
}

fn tokenize_encoded_words(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("=?") {
        if let Some((charset, bytes, consumed)) = parse_encoded_word(&rest[start + 2..]) {
            if start > 0 {
                segments.push(Segment::Text(&rest[..start]));
            }
            segments.push(Segment::Word { charset, bytes });
            rest = &rest[start + 2 + consumed..];
        } else {
            segments.push(Segment::Text(&rest[..start + 2]));
            rest = &rest[start + 2..];
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }

    segments
}

/// Parses `charset?encoding?data?=` (the text after `=?`).
///
/// Returns the charset, the transfer-decoded bytes and the number of bytes
/// consumed.
fn parse_encoded_word(s: &str) -> Option<(&str, Vec<u8>, usize)> {
    let charset_end = s.find('?')?;
    let charset = &s[..charset_end];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[charset_end + 1..];
    let encoding_end = rest.find('?')?;
    let encoding = &rest[..encoding_end];

    let rest = &rest[encoding_end + 1..];
    let data_end = rest.find("?=")?;
    let data = &rest[..data_end];
    if data.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(data.as_bytes()),
        "Q" | "q" => decode_q(data.as_bytes()),
        _ => return None,
    };

    Some((charset, bytes, charset_end + 1 + encoding_end + 1 + data_end + 2))
}

/// Decodes RFC 2047 "Q" encoding: `_` is a space, `=XX` a byte.
fn decode_q(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                if let (Some(high), Some(low)) = (hex_value(data.get(i + 1)), hex_value(data.get(i + 2))) {
                    result.push((high << 4) | low);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    result
}
