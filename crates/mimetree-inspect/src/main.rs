//! `mimetree` - inspect the structure of a MIME message.
//!
//! Reads a raw message from a file or standard input, decodes it and
//! prints the part tree, dumps it as JSON, or extracts a single part body.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use mimetree::{DecodeConfig, Decoder, Headers, MessagePart};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mimetree", version)]
#[command(about = "Decode a MIME message and inspect its part tree")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    decode: DecodeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Print an indented listing of the parts
    Tree {
        /// Message file, or `-` for standard input
        input: PathBuf,
    },

    /// Print the part tree as JSON (bodies omitted)
    Json {
        /// Message file, or `-` for standard input
        input: PathBuf,
    },

    /// Write the stored body of one part
    Extract {
        /// Message file, or `-` for standard input
        input: PathBuf,

        /// Part identifier, e.g. 0.2.1
        mime_id: String,

        /// Output file (defaults to standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct DecodeArgs {
    /// Keep bodies transfer-encoded
    #[arg(long, global = true)]
    raw_bodies: bool,

    /// Leave RFC 2047 encoded-words in header values
    #[arg(long, global = true)]
    raw_headers: bool,

    /// Input uses bare LF line endings
    #[arg(long, global = true)]
    lf: bool,

    /// Charset for unlabelled 8-bit header bytes
    #[arg(long, global = true, default_value = mimetree::DEFAULT_CHARSET)]
    charset: String,

    /// Maximum nesting depth
    #[arg(long, global = true, default_value_t = mimetree::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl DecodeArgs {
    fn to_config(&self) -> DecodeConfig {
        DecodeConfig::builder()
            .decode_bodies(!self.raw_bodies)
            .decode_headers(!self.raw_headers)
            .crlf(if self.lf { "\n" } else { mimetree::DEFAULT_CRLF })
            .default_charset(self.charset.clone())
            .max_depth(self.max_depth)
            .build()
    }
}

/// JSON view of a part: everything but the body.
#[derive(Serialize)]
struct PartSummary<'a> {
    mime_id: &'a str,
    mimetype: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    disposition: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    charset: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'a str>,
    size: usize,
    headers: &'a Headers,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parts: Vec<Self>,
}

impl<'a> From<&'a MessagePart> for PartSummary<'a> {
    fn from(part: &'a MessagePart) -> Self {
        Self {
            mime_id: part.mime_id(),
            mimetype: part.mimetype(),
            disposition: part.disposition(),
            filename: part.filename(),
            charset: part.charset(),
            encoding: part.encoding(),
            size: part.size(),
            headers: part.headers(),
            parts: part.parts().iter().map(Self::from).collect(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mimetree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let decoder = Decoder::new(cli.decode.to_config()).context("invalid decoder options")?;

    match &cli.command {
        Command::Tree { input } => {
            let message = load(&decoder, input)?;
            cmd_tree(&message)?;
        }
        Command::Json { input } => {
            let message = load(&decoder, input)?;
            cmd_json(&message)?;
        }
        Command::Extract {
            input,
            mime_id,
            output,
        } => {
            let message = load(&decoder, input)?;
            cmd_extract(&message, mime_id, output.as_deref())?;
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read standard input")?;
        return Ok(buf);
    }
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load(decoder: &Decoder, path: &Path) -> anyhow::Result<MessagePart> {
    let raw = read_input(path)?;
    debug!(bytes = raw.len(), path = %path.display(), "read message");

    let message = decoder
        .decode(&raw)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    info!(parts = message.iter().count(), "decoded message");
    Ok(message)
}

fn cmd_tree(message: &MessagePart) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    for part in message {
        let depth = part.mime_id().matches('.').count();
        let indent = "  ".repeat(depth);
        write!(
            out,
            "{indent}{} {} ({} bytes)",
            part.mime_id(),
            part.mimetype(),
            part.size()
        )?;
        if let Some(disposition) = part.disposition() {
            write!(out, " [{disposition}]")?;
        }
        if let Some(filename) = part.filename() {
            write!(out, " \"{filename}\"")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn cmd_json(message: &MessagePart) -> anyhow::Result<()> {
    let summary = PartSummary::from(message);
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}

fn cmd_extract(message: &MessagePart, mime_id: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let Some(part) = message.find(mime_id) else {
        bail!("no part with id {mime_id}");
    };
    let Some(body) = part.body() else {
        bail!("part {mime_id} ({}) has no body", part.mimetype());
    };

    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
            info!(mime_id, bytes = body.len(), path = %path.display(), "extracted part");
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(body)?;
            out.flush()?;
        }
    }

    Ok(())
}
