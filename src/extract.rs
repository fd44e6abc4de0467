// src/extract.rs
//
// Repair-order image -> vehicle descriptor.
//
// The vision model sits outside this crate. It is asked for
// `{"year", "make", "model", "engine"}` and we build the descriptor from
// whatever it gives back.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::ExtractionError;

pub trait DescriptorExtractor {
    fn extract(&self, image: &[u8]) -> Result<String, ExtractionError>;
}

impl<F> DescriptorExtractor for F
where
    F: Fn(&[u8]) -> Result<String, ExtractionError>,
{
    fn extract(&self, image: &[u8]) -> Result<String, ExtractionError> {
        self(image)
    }
}

#[derive(Debug, Default, Deserialize)]
struct VehicleReply {
    #[serde(default, deserialize_with = "lenient")]
    year: String,
    #[serde(default, deserialize_with = "lenient")]
    make: String,
    #[serde(default, deserialize_with = "lenient")]
    model: String,
    #[serde(default, deserialize_with = "lenient")]
    engine: String,
}

// Models sometimes answer `"year": 2020` or `"engine": null`.
fn lenient<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => s!(),
    })
}

/// Parse a model reply into `"<year> <make> <model> <engine>"`. The reply may
/// be wrapped in a markdown code fence or surrounded by chatter; the first
/// `{...}` object is used. Empty and placeholder parts are skipped.
pub fn parse_reply(reply: &str) -> Result<String, ExtractionError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => return Err(ExtractionError::Unparseable(snippet(reply))),
    };
    let v: VehicleReply = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Unparseable(format!("{e}: {}", snippet(reply))))?;

    let mut descriptor = s!();
    for part in [&v.year, &v.make, &v.model, &v.engine] {
        let part = part.trim();
        if part.is_empty() || part.starts_with('<') || part.eq_ignore_ascii_case("unknown") {
            continue;
        }
        if !descriptor.is_empty() { descriptor.push(' '); }
        descriptor.push_str(part);
    }
    if descriptor.is_empty() {
        return Err(ExtractionError::Unparseable(snippet(reply)));
    }
    Ok(descriptor)
}

fn snippet(s: &str) -> String {
    let t = s.trim();
    match t.char_indices().nth(80) {
        Some((i, _)) => join!(&t[..i], "…"),
        None => s!(t),
    }
}

/* ---------------- External program adapter ---------------- */

/// Pipes the image to `<program> [args..]` on stdin; stdout is the model reply.
#[derive(Clone, Debug)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }
}

impl DescriptorExtractor for CommandExtractor {
    fn extract(&self, image: &[u8]) -> Result<String, ExtractionError> {
        debug!(program = %self.program.display(), bytes = image.len(), "running extractor");
        let unavailable = |e: std::io::Error| {
            ExtractionError::Unavailable(format!("{}: {e}", self.program.display()))
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(unavailable)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).map_err(unavailable)?;
        }
        let out = child.wait_with_output().map_err(unavailable)?;
        if !out.status.success() {
            return Err(ExtractionError::Failed {
                status: out.status.to_string(),
                stderr: s!(String::from_utf8_lossy(&out.stderr).trim()),
            });
        }
        parse_reply(&String::from_utf8_lossy(&out.stdout))
    }
}
