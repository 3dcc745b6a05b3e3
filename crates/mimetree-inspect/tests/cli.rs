//! Tests that drive the `mimetree` binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const MESSAGE: &str = concat!(
    "Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n",
    "Content-Type: multipart/mixed; boundary=\"B\"\r\n",
    "\r\n",
    "--B\r\n",
    "Content-Type: text/plain\r\n",
    "\r\n",
    "hello\r\n",
    "--B\r\n",
    "Content-Type: application/octet-stream\r\n",
    "Content-Disposition: attachment; filename=\"data.txt\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "cGF5bG9hZA==\r\n",
    "--B--\r\n",
);

fn run(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_mimetree"))
        .args(args)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start mimetree");
    child.stdin.take().unwrap().write_all(stdin).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn tree_lists_parts() {
    let output = run(&["tree", "-"], MESSAGE.as_bytes());
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "0 multipart/mixed (0 bytes)");
    assert_eq!(lines[1], "  0.1 text/plain (5 bytes)");
    assert_eq!(
        lines[2],
        "  0.2 application/octet-stream (7 bytes) [attachment] \"data.txt\""
    );
}

#[test]
fn json_omits_bodies() {
    let output = run(&["json", "-"], MESSAGE.as_bytes());
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["mime_id"], "0");
    assert_eq!(value["headers"]["subject"], "Café");
    assert_eq!(value["parts"][1]["filename"], "data.txt");
    assert_eq!(value["parts"][1]["size"], 7);
    assert!(value["parts"][1].get("body").is_none());
}

#[test]
fn raw_headers_flag() {
    let output = run(&["json", "--raw-headers", "-"], MESSAGE.as_bytes());
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["headers"]["subject"], "=?UTF-8?Q?Caf=C3=A9?=");
}

#[test]
fn extract_to_stdout() {
    let output = run(&["extract", "-", "0.2"], MESSAGE.as_bytes());
    assert!(output.status.success());
    assert_eq!(output.stdout, b"payload");

    let output = run(&["extract", "--raw-bodies", "-", "0.2"], MESSAGE.as_bytes());
    assert_eq!(output.stdout, b"cGF5bG9hZA==");
}

#[test]
fn extract_to_file() {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("mimetree-extract.txt");
    let output = run(
        &["extract", "-", "0.1", "-o", path.to_str().unwrap()],
        MESSAGE.as_bytes(),
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn unknown_part_fails() {
    let output = run(&["extract", "-", "0.9"], MESSAGE.as_bytes());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no part with id 0.9"));
}

#[test]
fn missing_boundary_fails() {
    let output = run(
        &["tree", "-"],
        b"Content-Type: multipart/mixed\r\n\r\nbody\r\n",
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("boundary"));
}

#[test]
fn lf_input() {
    let message = "Content-Type: multipart/alternative; boundary=L\n\n--L\n\none\n--L\n\ntwo\n--L--\n";
    let output = run(&["tree", "--lf", "-"], message.as_bytes());
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("0.2 text/plain (3 bytes)"));
}
