//! Transport envelope.
//!
//! A payload travels over a line-oriented text channel (typically a log) as
//! base64 of its UTF-8 JSON text, bounded by `[START]` and `[END]` on a
//! single line and prefixed by an identifying tag:
//!
//! ```text
//! [QVPEN_EXPORTER] [START]eyJ0aW1lc3RhbXAiOi...[END]
//! ```
//!
//! A segment may hold a whole session payload, or a single stroke object.
//! Per-stroke exports are bracketed by `[START_EXPORT]` and `[END_EXPORT]`
//! lines; [`extract`] reassembles them into one session payload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::codec::EXPORTED_DATA_KEY;
use crate::error::{Error, Result};

/// Opens a base64 segment.
pub const START_MARKER: &str = "[START]";
/// Closes a base64 segment.
pub const END_MARKER: &str = "[END]";
/// Line marking the beginning of a per-stroke export.
pub const BEGIN_EXPORT_MARKER: &str = "[START_EXPORT]";
/// Line marking the end of a per-stroke export.
pub const END_EXPORT_MARKER: &str = "[END_EXPORT]";

/// Timestamp format used in session payloads.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Timestamp format at the start of host log lines.
const LOG_TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Wrap payload text as one transport line.
#[must_use]
pub fn wrap(tag: &str, text: &str) -> String {
    format!("{tag} {START_MARKER}{}{END_MARKER}", STANDARD.encode(text))
}

/// Decode the base64 body of one segment.
///
/// # Errors
///
/// Returns [`Error::MalformedEnvelope`] if the body is not base64 of UTF-8 text.
pub fn unwrap_segment(body: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(body.trim())
        .map_err(|e| Error::MalformedEnvelope(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::MalformedEnvelope(format!("invalid UTF-8: {e}")))
}

/// Base64 bodies of every `[START]...[END]` segment on `line`.
pub fn segments(line: &str) -> impl Iterator<Item = &str> {
    let mut rest = line;
    std::iter::from_fn(move || {
        let start = rest.find(START_MARKER)? + START_MARKER.len();
        let len = rest[start..].find(END_MARKER)?;
        let body = &rest[start..start + len];
        rest = &rest[start + len + END_MARKER.len()..];
        Some(body)
    })
}

/// What an extracted payload was assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedFrom {
    /// One whole-session segment
    Session,
    /// A run of single-stroke segments
    Strokes,
}

/// Payload recovered from log text.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Session payload JSON text
    pub text: String,
    /// Number of stroke entries in the payload
    pub strokes: usize,
    /// Segments that could not be decoded
    pub skipped: usize,
    /// Source shape
    pub from: ExtractedFrom,
}

#[derive(Default)]
struct Batch {
    timestamp: Option<String>,
    strokes: Vec<Value>,
}

/// Recover the most recent exported payload from noisy log text.
///
/// If the last decodable segment is a whole session, that session is
/// returned. Otherwise the single strokes of the most recent per-stroke
/// export are assembled into a session.
///
/// # Errors
///
/// Returns [`Error::EnvelopeNotFound`] if the text has no segments, and
/// [`Error::MalformedEnvelope`] if none of them can be decoded.
pub fn extract(log: &str) -> Result<Extraction> {
    let mut found = 0usize;
    let mut skipped = 0usize;
    let mut batch = Batch::default();
    let mut latest: Option<ExtractedFrom> = None;
    let mut session: Option<Value> = None;

    for line in log.lines() {
        if line.contains(BEGIN_EXPORT_MARKER) {
            batch = Batch {
                timestamp: log_timestamp(line),
                strokes: Vec::new(),
            };
            continue;
        }

        for body in segments(line) {
            found += 1;
            match decode_segment(body) {
                Ok(Segment::Session(value)) => {
                    session = Some(value);
                    latest = Some(ExtractedFrom::Session);
                }
                Ok(Segment::Stroke(value)) => {
                    if batch.timestamp.is_none() {
                        batch.timestamp = log_timestamp(line);
                    }
                    batch.strokes.push(value);
                    latest = Some(ExtractedFrom::Strokes);
                }
                Err(e) => {
                    tracing::warn!("Skipping segment {}: {}", found, e);
                    skipped += 1;
                }
            }
        }
    }

    if found == 0 {
        return Err(Error::EnvelopeNotFound(format!(
            "no {START_MARKER}...{END_MARKER} segments in input"
        )));
    }

    let (value, from) = match (latest, session) {
        (Some(ExtractedFrom::Session), Some(value)) => (value, ExtractedFrom::Session),
        (Some(ExtractedFrom::Strokes), _) => (assemble(batch), ExtractedFrom::Strokes),
        _ => {
            return Err(Error::MalformedEnvelope(format!(
                "none of {found} segments could be decoded"
            )))
        }
    };

    let strokes = value
        .get(EXPORTED_DATA_KEY)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let text = serde_json::to_string(&value).map_err(|e| Error::Serialization(e.to_string()))?;

    tracing::info!(
        "Extracted {} strokes from {} segments ({} skipped)",
        strokes,
        found,
        skipped
    );
    Ok(Extraction {
        text,
        strokes,
        skipped,
        from,
    })
}

enum Segment {
    Session(Value),
    Stroke(Value),
}

fn decode_segment(body: &str) -> Result<Segment> {
    let text = unwrap_segment(body)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid JSON: {e}")))?;

    match &value {
        Value::Object(map) if map.contains_key(EXPORTED_DATA_KEY) => Ok(Segment::Session(value)),
        Value::Object(map) if map.contains_key("positions") || map.contains_key("color") => {
            Ok(Segment::Stroke(value))
        }
        _ => Err(Error::MalformedEnvelope(
            "segment is neither a session nor a stroke".to_string(),
        )),
    }
}

fn assemble(batch: Batch) -> Value {
    let mut root = Map::new();
    root.insert(
        "timestamp".to_string(),
        Value::String(batch.timestamp.unwrap_or_default()),
    );
    root.insert(EXPORTED_DATA_KEY.to_string(), Value::Array(batch.strokes));
    Value::Object(root)
}

/// Timestamp at the start of a host log line, reformatted for payloads.
fn log_timestamp(line: &str) -> Option<String> {
    let prefix = line.trim_start().get(..19)?;
    NaiveDateTime::parse_from_str(prefix, LOG_TIMESTAMP_FORMAT)
        .ok()
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}
