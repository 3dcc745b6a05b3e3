//! Byte-level splitting of messages into header/body blocks and of
//! multipart bodies into their parts.

/// Returns the position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    find_from(haystack, needle, 0)
}

/// Returns the position of the first occurrence of `needle` at or after `start`.
pub(crate) fn find_from(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if needle.is_empty() || start > haystack.len() {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + start)
}

/// Splits a message or part into its header block and body block.
///
/// The blocks are separated by the first empty line, i.e. the first
/// occurrence of two consecutive terminators. Without one, the whole input
/// is the header block and the body is empty. A single trailing terminator
/// is removed from the body.
#[must_use]
pub fn split_header_body<'a>(input: &'a [u8], crlf: &[u8]) -> (&'a [u8], &'a [u8]) {
    let separator = [crlf, crlf].concat();
    let Some(pos) = find(input, &separator) else {
        return (input, &[]);
    };

    let header = &input[..pos];
    let body = &input[pos + separator.len()..];
    let body = body.strip_suffix(crlf).unwrap_or(body);
    (header, body)
}

/// Splits a multipart body on `--{boundary}` delimiter lines.
///
/// The preamble before the first delimiter is discarded, as is everything
/// after the closing `--{boundary}--` delimiter. If the closing delimiter is
/// missing, the text after the last delimiter is kept as a final part.
///
/// A delimiter only counts at the start of the body or directly after a
/// line terminator, and only when followed by `--`, whitespace, a line
/// break, or the end of the body. Each returned segment starts right after
/// its delimiter and still carries the remainder of the delimiter line and
/// the terminator preceding the next delimiter; [`split_header_body`]
/// expects exactly that shape.
#[must_use]
pub fn split_boundary<'a>(body: &'a [u8], boundary: &str, crlf: &[u8]) -> Vec<&'a [u8]> {
    let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();

    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut search = 0;

    while let Some(pos) = find_from(body, &delimiter, search) {
        search = pos + 1;
        if !is_delimiter_at(body, pos, delimiter.len(), crlf) {
            continue;
        }

        let after = pos + delimiter.len();
        if let Some(start) = current {
            parts.push(&body[start..pos]);
        }

        if body[after..].starts_with(b"--") {
            return parts;
        }
        current = Some(after);
    }

    // No closing delimiter: keep the trailing part rather than dropping it.
    if let Some(start) = current {
        let tail = &body[start..];
        if !tail.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(boundary, "multipart body has no closing delimiter");
            parts.push(tail);
        }
    }

    parts
}

fn is_delimiter_at(body: &[u8], pos: usize, len: usize, crlf: &[u8]) -> bool {
    let line_start = pos == 0 || body[..pos].ends_with(crlf) || body[pos - 1] == b'\n';
    if !line_start {
        return false;
    }

    match body.get(pos + len) {
        None | Some(b' ' | b'\t' | b'\r' | b'\n') => true,
        Some(b'-') => body.get(pos + len + 1) == Some(&b'-'),
        Some(_) => false,
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

    const CRLF: &[u8] = b"\r\n";

    #[test]
    fn test_find() {
        assert_eq!(find(b"hello world", b"world"), Some(6));
        assert_eq!(find(b"hello", b"xyz"), None);
        assert_eq!(find(b"hello", b""), None);
        assert_eq!(find_from(b"abcabc", b"abc", 1), Some(3));
        assert_eq!(find_from(b"abc", b"abc", 4), None);
    }

    #[test]
    fn test_split_header_body() {
        let input = b"Subject: Hi\r\nFrom: a@b\r\n\r\nBody text\r\n";
        let (header, body) = split_header_body(input, CRLF);
        assert_eq!(header, b"Subject: Hi\r\nFrom: a@b");
        assert_eq!(body, b"Body text");
    }

    #[test]
    fn test_split_header_body_strips_single_terminator() {
        let (_, body) = split_header_body(b"A: b\r\n\r\nline\r\n\r\n", CRLF);
        assert_eq!(body, b"line\r\n");
    }

    #[test]
    fn test_split_header_body_without_separator() {
        let input = b"Subject: Hi\r\nFrom: a@b";
        let (header, body) = split_header_body(input, CRLF);
        assert_eq!(header, input);
        assert!(body.is_empty());
    }

    #[test]
    fn test_split_header_body_lf() {
        let (header, body) = split_header_body(b"A: b\n\nbody\n", b"\n");
        assert_eq!(header, b"A: b");
        assert_eq!(body, b"body");
    }

    #[test]
    fn test_split_boundary() {
        let body = b"preamble\r\n--B\r\nX: 1\r\n\r\none\r\n--B\r\n\r\ntwo\r\n--B--\r\nepilogue";
        let parts = split_boundary(body, "B", CRLF);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], b"\r\nX: 1\r\n\r\none\r\n");
        assert_eq!(parts[1], b"\r\n\r\ntwo\r\n");
    }

    #[test]
    fn test_split_boundary_ignores_longer_boundary() {
        let body = b"--B\r\n\r\nouter\r\n--Binner\r\n--B--";
        let parts = split_boundary(body, "B", CRLF);
        assert_eq!(parts, vec![b"\r\n\r\nouter\r\n--Binner\r\n".as_slice()]);
    }

    #[test]
    fn test_split_boundary_mid_line_not_delimiter() {
        let body = b"--B\r\n\r\ntext --B inside\r\n--B--";
        let parts = split_boundary(body, "B", CRLF);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], b"\r\n\r\ntext --B inside\r\n");
    }

    #[test]
    fn test_split_boundary_unterminated() {
        let body = b"--B\r\n\r\none\r\n--B\r\n\r\ntwo";
        let parts = split_boundary(body, "B", CRLF);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], b"\r\n\r\ntwo");
    }

    #[test]
    fn test_split_boundary_no_delimiter() {
        assert!(split_boundary(b"no parts here", "B", CRLF).is_empty());
    }
}
