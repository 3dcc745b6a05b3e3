//! End-to-end decoding tests.
//!
//! Each test feeds a complete raw message through the public API and
//! inspects the resulting part tree.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mimetree::{DecodeConfig, Decoder, Error, HeaderValue, MessagePart, decode};

fn decode_default(raw: &str) -> MessagePart {
    decode(raw.as_bytes(), &DecodeConfig::default()).expect("message should decode")
}

const MIXED: &str = concat!(
    "From: sender@example.com\r\n",
    "To: recipient@example.com\r\n",
    "Subject: Two parts\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/mixed; boundary=\"B\"\r\n",
    "\r\n",
    "This is a multi-part message in MIME format.\r\n",
    "--B\r\n",
    "Content-Type: text/plain; charset=utf-8\r\n",
    "Content-Transfer-Encoding: quoted-printable\r\n",
    "\r\n",
    "Caf=C3=A9 au lait\r\n",
    "--B\r\n",
    "Content-Type: application/octet-stream; name=\"data.bin\"\r\n",
    "Content-Disposition: attachment\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "AAEC\r\n",
    "AwQ=\r\n",
    "--B--\r\n",
    "epilogue\r\n",
);

#[test]
fn single_part_text_plain() {
    let raw = concat!(
        "Subject: Hi\r\n",
        "Content-Type: text/plain\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "SGVsbG8sIFdvcmxkIQ==\r\n",
    );
    let message = decode_default(raw);

    assert_eq!(message.mimetype(), "text/plain");
    assert_eq!(message.mime_id(), "0");
    assert_eq!(message.body(), Some(b"Hello, World!".as_slice()));
    assert_eq!(message.size(), 13);
    assert!(message.parts().is_empty());
}

#[test]
fn missing_separator_means_headers_only() {
    let message = decode_default("Subject: Only headers\r\nFrom: a@example.com");

    assert_eq!(message.header("subject"), Some("Only headers"));
    assert_eq!(message.header("from"), Some("a@example.com"));
    assert_eq!(message.body(), Some(b"".as_slice()));
    assert_eq!(message.size(), 0);
}

#[test]
fn multipart_mixed_children_ids() {
    let message = decode_default(MIXED);

    assert_eq!(message.mimetype(), "multipart/mixed");
    assert_eq!(message.mime_id(), "0");
    assert!(message.body().is_none());

    let ids: Vec<&str> = message.parts().iter().map(MessagePart::mime_id).collect();
    assert_eq!(ids, vec!["0.1", "0.2"]);

    let text = &message.parts()[0];
    assert_eq!(text.mimetype(), "text/plain");
    assert_eq!(text.charset(), Some("utf-8"));
    assert_eq!(text.encoding(), Some("quoted-printable"));
    assert_eq!(text.body(), Some("Café au lait".as_bytes()));

    let attachment = &message.parts()[1];
    assert_eq!(attachment.disposition(), Some("attachment"));
    assert_eq!(attachment.filename(), Some("data.bin"));
    assert_eq!(attachment.body(), Some([0u8, 1, 2, 3, 4].as_slice()));
    assert_eq!(attachment.size(), 5);
}

#[test]
fn nested_alternative_ids_depth_first() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=outer\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=inner\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "plain\r\n",
        "--inner\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<b>html</b>\r\n",
        "--inner--\r\n",
        "--outer\r\n",
        "Content-Type: image/png\r\n",
        "Content-Disposition: inline; filename=logo.png\r\n",
        "\r\n",
        "PNG\r\n",
        "--outer--\r\n",
    );
    let message = decode_default(raw);

    let tree: Vec<(&str, &str)> = message
        .iter()
        .map(|part| (part.mime_id(), part.mimetype()))
        .collect();
    assert_eq!(
        tree,
        vec![
            ("0", "multipart/mixed"),
            ("0.1", "multipart/alternative"),
            ("0.1.1", "text/plain"),
            ("0.1.2", "text/html"),
            ("0.2", "image/png"),
        ]
    );
    assert_eq!(message.find("0.1.2").unwrap().body(), Some(b"<b>html</b>".as_slice()));
    assert_eq!(message.find("0.2").unwrap().filename(), Some("logo.png"));
}

#[test]
fn boundary_prefix_of_nested_boundary() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: multipart/alternative; boundary=b2\r\n",
        "\r\n",
        "--b2\r\n",
        "\r\n",
        "one\r\n",
        "--b2\r\n",
        "\r\n",
        "two\r\n",
        "--b2--\r\n",
        "--b--\r\n",
    );
    let message = decode_default(raw);

    assert_eq!(message.parts().len(), 1);
    assert_eq!(message.parts()[0].parts().len(), 2);
    assert_eq!(message.find("0.1.2").unwrap().body(), Some(b"two".as_slice()));
}

#[test]
fn missing_boundary_fails() {
    let raw = "Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nbody\r\n--x--\r\n";
    let result = decode(raw.as_bytes(), &DecodeConfig::default());

    assert_eq!(
        result,
        Err(Error::MissingBoundary {
            content_type: "multipart/mixed".to_string()
        })
    );
}

#[test]
fn encoded_word_subject() {
    let raw = "Subject: =?UTF-8?Q?Hello=2C_World?=\r\n\r\nbody";

    let decoded = decode_default(raw);
    assert_eq!(decoded.header("subject"), Some("Hello, World"));

    let config = DecodeConfig::builder().decode_headers(false).build();
    let raw_headers = decode(raw.as_bytes(), &config).unwrap();
    assert_eq!(raw_headers.header("subject"), Some("=?UTF-8?Q?Hello=2C_World?="));
}

#[test]
fn rfc2231_continuation_filename() {
    let raw = concat!(
        "Content-Type: application/pdf\r\n",
        "Content-Disposition: attachment;\r\n",
        " filename*0*=UTF-8''Caf%C3%A9;\r\n",
        " filename*1*=.pdf\r\n",
        "\r\n",
        "%PDF-1.4\r\n",
    );
    let message = decode_default(raw);

    assert_eq!(message.filename(), Some("Café.pdf"));
    assert_eq!(message.d_parameters().get("filename"), Some("Café.pdf"));
}

#[test]
fn encoded_word_filename_without_header_decoding() {
    let raw = concat!(
        "Content-Type: application/pdf; name=\"=?UTF-8?B?w6l0w6kucGRm?=\"\r\n",
        "\r\n",
        "x",
    );

    let config = DecodeConfig::builder().decode_headers(false).build();
    let message = decode(raw.as_bytes(), &config).unwrap();
    assert_eq!(message.filename(), Some("été.pdf"));
    assert_eq!(
        message.ctype_parameters().get("name"),
        Some("=?UTF-8?B?w6l0w6kucGRm?=")
    );

    let message = decode_default(raw);
    assert_eq!(message.filename(), Some("été.pdf"));
}

#[test]
fn size_matches_body_everywhere() {
    let message = decode_default(MIXED);

    for part in &message {
        let expected = part.body().map_or(0, <[u8]>::len);
        assert_eq!(part.size(), expected, "part {}", part.mime_id());
    }
}

#[test]
fn repeated_header_becomes_list() {
    let raw = concat!(
        "Received: from a by b\r\n",
        "Received: from c by d\r\n",
        "Subject: once\r\n",
        "\r\n",
        "body",
    );
    let message = decode_default(raw);

    assert_eq!(
        message.headers().get("received"),
        Some(&HeaderValue::Multiple(vec![
            "from a by b".to_string(),
            "from c by d".to_string(),
        ]))
    );
    assert_eq!(
        message.headers().get("subject"),
        Some(&HeaderValue::Single("once".to_string()))
    );

    let names: Vec<&str> = message.headers().iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["received", "subject"]);
}

#[test]
fn header_line_without_colon_is_skipped() {
    let raw = "Subject: ok\r\nThis line has no colon\r\nTo: x@example.com\r\n\r\nbody";
    let message = decode_default(raw);

    assert_eq!(message.headers().len(), 2);
    assert_eq!(message.header("subject"), Some("ok"));
    assert_eq!(message.header("to"), Some("x@example.com"));
    assert_eq!(message.body(), Some(b"body".as_slice()));
}

#[test]
fn message_rfc822_has_body_and_child() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=M\r\n",
        "\r\n",
        "--M\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "See attached.\r\n",
        "--M\r\n",
        "Content-Type: message/rfc822\r\n",
        "\r\n",
        "Subject: Forwarded\r\n",
        "Content-Type: multipart/alternative; boundary=F\r\n",
        "\r\n",
        "--F\r\n",
        "\r\n",
        "inner plain\r\n",
        "--F--\r\n",
        "--M--\r\n",
    );
    let message = decode_default(raw);

    let forwarded = message.find("0.2").unwrap();
    assert_eq!(forwarded.mimetype(), "message/rfc822");
    assert_eq!(forwarded.parts().len(), 1);
    assert!(forwarded.body().unwrap().starts_with(b"Subject: Forwarded\r\n"));
    assert_eq!(forwarded.size(), forwarded.body().unwrap().len());

    let embedded = forwarded.find("0.2.1").unwrap();
    assert_eq!(embedded.header("subject"), Some("Forwarded"));
    assert_eq!(embedded.mimetype(), "multipart/alternative");
    assert_eq!(
        message.find("0.2.1.1").unwrap().body(),
        Some(b"inner plain".as_slice())
    );
}

#[test]
fn bodies_excluded() {
    let config = DecodeConfig::builder().include_bodies(false).build();
    let message = decode(MIXED.as_bytes(), &config).unwrap();

    for part in &message {
        assert!(part.body().is_none());
        assert_eq!(part.size(), 0);
    }
    assert_eq!(message.parts().len(), 2);
}

#[test]
fn bodies_not_transfer_decoded() {
    let config = DecodeConfig::builder().decode_bodies(false).build();
    let message = decode(MIXED.as_bytes(), &config).unwrap();

    assert_eq!(message.parts()[0].body(), Some(b"Caf=C3=A9 au lait".as_slice()));
    assert_eq!(message.parts()[1].body(), Some(b"AAEC\r\nAwQ=".as_slice()));
    assert_eq!(message.parts()[1].size(), 10);
}

#[test]
fn lf_line_endings() {
    let raw = "Content-Type: multipart/mixed; boundary=L\n\n--L\nContent-Type: text/plain\n\nunix\n--L--\n";
    let config = DecodeConfig::builder().crlf("\n").build();
    let message = decode(raw.as_bytes(), &config).unwrap();

    assert_eq!(message.parts().len(), 1);
    assert_eq!(message.parts()[0].body(), Some(b"unix".as_slice()));
}

#[test]
fn folded_headers_and_latin1_bytes() {
    let raw = b"Subject: first\r\n\tsecond\r\nX-Name: Jos\xe9\r\n\r\nbody".to_vec();
    let config = DecodeConfig::builder().default_charset("ISO-8859-1").build();
    let message = decode(&raw, &config).unwrap();

    assert_eq!(message.header("subject"), Some("first second"));
    assert_eq!(message.header("x-name"), Some("José"));
}

#[test]
fn uuencoded_attachment() {
    let raw = concat!(
        "Content-Type: application/octet-stream\r\n",
        "Content-Transfer-Encoding: x-uuencode\r\n",
        "\r\n",
        "begin 644 cat.txt\r\n",
        "#0V%T\r\n",
        "`\r\n",
        "end\r\n",
    );
    let message = decode_default(raw);

    assert_eq!(message.body(), Some(b"Cat".as_slice()));
}

#[test]
fn unknown_transfer_encoding_passes_through() {
    let raw = "Content-Transfer-Encoding: x-custom\r\n\r\n=41 raw";
    let message = decode_default(raw);

    assert_eq!(message.encoding(), Some("x-custom"));
    assert_eq!(message.body(), Some(b"=41 raw".as_slice()));
}

#[test]
fn malformed_base64_is_best_effort() {
    let raw = "Content-Transfer-Encoding: base64\r\n\r\nSGVs!!bG8=garbage*";
    let message = decode_default(raw);

    assert!(message.body().unwrap().starts_with(b"Hello"));
    assert_eq!(message.size(), message.body().unwrap().len());
}

#[test]
fn depth_exceeded_is_reported() {
    let mut raw = String::new();
    for level in 0..10 {
        raw.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=L{level}\r\n\r\n--L{level}\r\n"
        ));
    }
    raw.push_str("\r\nleaf\r\n");

    let config = DecodeConfig::builder().max_depth(4).build();
    let decoder = Decoder::new(config).unwrap();
    assert_eq!(
        decoder.decode(raw.as_bytes()),
        Err(Error::DepthExceeded { limit: 4 })
    );

    let decoder = Decoder::new(DecodeConfig::default()).unwrap();
    let message = decoder.decode(raw.as_bytes()).unwrap();
    assert_eq!(message.iter().count(), 11);
}

#[test]
fn structure_without_tree_conversion() {
    let decoder = Decoder::new(DecodeConfig::default()).unwrap();
    let structure = decoder.decode_structure(MIXED.as_bytes()).unwrap();

    assert_eq!(structure.parts.len(), 2);
    assert_eq!(structure.parts[1].content_type.mimetype(), "application/octet-stream");

    let tree = MessagePart::from_raw(structure, decoder.config());
    assert_eq!(tree, decoder.decode(MIXED.as_bytes()).unwrap());
}

#[test]
fn attachments_listing() {
    let message = decode_default(MIXED);
    let names: Vec<&str> = message.attachments().filter_map(MessagePart::filename).collect();

    assert_eq!(names, vec!["data.bin"]);
}

#[test]
fn invalid_config_rejected() {
    let config = DecodeConfig::builder().max_depth(0).build();
    assert!(matches!(
        decode(b"Subject: x\r\n\r\ny", &config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn encoded_words_in_parameters_keep_their_syntax() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=\"=?utf-8?q?abc?=\"\r\n",
        "\r\n",
        "--=?utf-8?q?abc?=\r\n",
        "Content-Type: application/pdf; name=\"=?UTF-8?Q?a=22b.pdf?=\"\r\n",
        "\r\n",
        "one\r\n",
        "--=?utf-8?q?abc?=\r\n",
        "Content-Disposition: attachment; filename==?UTF-8?Q?a=3Bb.pdf?=\r\n",
        "\r\n",
        "two\r\n",
        "--=?utf-8?q?abc?=--\r\n",
    );
    let message = decode_default(raw);

    assert_eq!(message.ctype_parameters().get("boundary"), Some("=?utf-8?q?abc?="));
    assert_eq!(message.parts().len(), 2);
    assert_eq!(message.parts()[0].filename(), Some("a\"b.pdf"));
    assert_eq!(message.parts()[0].body(), Some(b"one".as_slice()));
    assert_eq!(message.parts()[1].filename(), Some("a;b.pdf"));
    assert_eq!(message.parts()[1].body(), Some(b"two".as_slice()));
}

#[test]
fn empty_boundary_fails() {
    let raw = "Content-Type: multipart/mixed; boundary=\"\"\r\n\r\n--\r\n\r\na\r\n----\r\n";

    assert_eq!(
        decode(raw.as_bytes(), &DecodeConfig::default()),
        Err(Error::MissingBoundary {
            content_type: "multipart/mixed".to_string()
        })
    );
}

#[test]
fn transfer_encoding_value_is_kept_whole() {
    let raw = "Content-Transfer-Encoding: base64; x-note=1\r\n\r\naGk=";
    let message = decode_default(raw);

    assert_eq!(message.encoding(), Some("base64; x-note=1"));
    assert_eq!(message.body(), Some(b"hi".as_slice()));
}
