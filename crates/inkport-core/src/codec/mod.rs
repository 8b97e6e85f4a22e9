//! Stroke payload codec.
//!
//! Converts between in-memory stroke records and the textual session
//! payload. Both directions are pure: no I/O, no rendering side effects.
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "timestamp": "<opaque string>",
//!   "exportedData": [
//!     {
//!       "color": { "type": "const" | "gradient", "value": ["RRGGBB", ...] },
//!       "width": <number>,
//!       "positions": [x0,y0,z0, x1,y1,z1, ...]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Decode policy
//!
//! A malformed top-level shape is a [`DecodeError`]. A malformed stroke is
//! skipped and reported as a [`StrokeError`] in [`DecodedPayload::skipped`];
//! the remaining strokes are still decoded.

use glam::Vec3;
use serde_json::Value;
use thiserror::Error;

pub mod color;
pub mod wire;

pub use color::{Gradient, Rgb24, StrokeColor};
pub use wire::EXPORTED_DATA_KEY;

use crate::error::{Error, Result};

/// Explicit widths at or below this are treated as absent.
pub const MIN_EXPLICIT_WIDTH: f32 = 0.0001;

/// One exported stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeRecord {
    color: StrokeColor,
    width: f32,
    positions: Vec<Vec3>,
}

impl StrokeRecord {
    /// Minimum number of points in a stroke.
    pub const MIN_POINTS: usize = 2;

    /// Create a stroke, validating its width and point count.
    pub fn new(
        color: StrokeColor,
        width: f32,
        positions: Vec<Vec3>,
    ) -> std::result::Result<Self, StrokeErrorKind> {
        if positions.len() < Self::MIN_POINTS {
            return Err(StrokeErrorKind::TooFewPoints(positions.len()));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(StrokeErrorKind::InvalidWidth(width));
        }
        Ok(Self {
            color,
            width,
            positions,
        })
    }

    /// Stroke color.
    #[must_use]
    pub fn color(&self) -> &StrokeColor {
        &self.color
    }

    /// Resolved stroke width (always positive).
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Ordered points, at least two.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Mean of the stroke's points.
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        self.positions.iter().copied().sum::<Vec3>() / self.positions.len() as f32
    }
}

/// The interchange unit: every stroke of one export plus its timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionPayload {
    /// Provenance string, not parsed
    pub timestamp: String,
    /// Strokes in export order
    pub strokes: Vec<StrokeRecord>,
}

impl SessionPayload {
    /// Create a payload.
    #[must_use]
    pub fn new(timestamp: impl Into<String>, strokes: Vec<StrokeRecord>) -> Self {
        Self {
            timestamp: timestamp.into(),
            strokes,
        }
    }

    /// Group strokes by their primary color, in first-seen order.
    #[must_use]
    pub fn group_by_color(&self) -> Vec<StrokeGroup<'_>> {
        self.group_by(|stroke| GroupKey {
            color: stroke.color().primary(),
            width: None,
        })
    }

    /// Group strokes by primary color and exact width, in first-seen order.
    #[must_use]
    pub fn group_by_color_and_width(&self) -> Vec<StrokeGroup<'_>> {
        self.group_by(|stroke| GroupKey {
            color: stroke.color().primary(),
            width: Some(stroke.width().to_bits()),
        })
    }

    fn group_by(&self, key_of: impl Fn(&StrokeRecord) -> GroupKey) -> Vec<StrokeGroup<'_>> {
        let mut groups: Vec<StrokeGroup<'_>> = Vec::new();
        for stroke in &self.strokes {
            let key = key_of(stroke);
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.strokes.push(stroke),
                None => groups.push(StrokeGroup {
                    key,
                    strokes: vec![stroke],
                }),
            }
        }
        groups
    }
}

/// Key strokes are grouped under for presentation or batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Primary color
    pub color: Rgb24,
    /// Width bit pattern, when grouping by width too
    pub width: Option<u32>,
}

impl GroupKey {
    /// Width of the group, when grouped by width.
    #[must_use]
    pub fn width(&self) -> Option<f32> {
        self.width.map(f32::from_bits)
    }

    /// Node name for the group container.
    #[must_use]
    pub fn label(&self) -> String {
        match self.width() {
            Some(width) => format!("Group_{}_{width:.3}", self.color.to_hex()),
            None => format!("Group_{}", self.color.to_hex()),
        }
    }
}

/// A borrowed batch of strokes sharing a [`GroupKey`].
#[derive(Debug, Clone)]
pub struct StrokeGroup<'a> {
    /// Shared key
    pub key: GroupKey,
    /// Member strokes in payload order
    pub strokes: Vec<&'a StrokeRecord>,
}

/// Top-level payload failures. Callers treat these as "nothing to import".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Text is not JSON
    #[error("not valid JSON: {0}")]
    Json(String),
    /// Root value is not an object
    #[error("root is not an object")]
    NotAnObject,
    /// `exportedData` key is absent
    #[error("exportedData is missing")]
    MissingExportedData,
    /// `exportedData` is not an array
    #[error("exportedData is not an array")]
    ExportedDataNotArray,
    /// `exportedData` has no entries
    #[error("exportedData is empty")]
    Empty,
}

/// Why a single stroke entry was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrokeErrorKind {
    /// Entry is not an object
    #[error("entry is not an object")]
    NotAnObject,
    /// `color` is absent or not an object
    #[error("color is missing")]
    MissingColor,
    /// `color.type` is absent or not a string
    #[error("color.type is missing")]
    MissingColorType,
    /// `color.type` is not `const` or `gradient`
    #[error("unknown color.type '{0}'")]
    UnknownColorType(String),
    /// `color.value` is absent or not an array
    #[error("color.value is missing")]
    MissingColorValues,
    /// `color.value` is an empty array
    #[error("color.value is empty")]
    EmptyColorValues,
    /// One `color.value` entry is not a 6-digit hex string
    #[error("color.value[{index}] is not a hex color: {value}")]
    InvalidColorValue {
        /// Position in `color.value`
        index: usize,
        /// Offending value as JSON text
        value: String,
    },
    /// Gradient with fewer than two stops
    #[error("gradient needs at least 2 stops, got {0}")]
    TooFewGradientStops(usize),
    /// `positions` is absent or not an array
    #[error("positions is missing")]
    MissingPositions,
    /// Flat coordinate count is not a multiple of 3
    #[error("positions has {0} values, not a multiple of 3")]
    NotTriples(usize),
    /// Fewer than two points
    #[error("stroke needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    /// A coordinate is not a finite number
    #[error("positions[{0}] is not a number")]
    InvalidCoordinate(usize),
    /// Width given to a constructor is not positive
    #[error("width {0} is not positive")]
    InvalidWidth(f32),
}

/// A rejected stroke entry and its position in `exportedData`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("stroke {index}: {kind}")]
pub struct StrokeError {
    /// Index in `exportedData`
    pub index: usize,
    /// Failure
    pub kind: StrokeErrorKind,
}

/// Result of a successful top-level decode.
#[derive(Debug, Clone, Default)]
pub struct DecodedPayload {
    /// Strokes that passed validation
    pub payload: SessionPayload,
    /// Entries that were skipped
    pub skipped: Vec<StrokeError>,
    /// Number of strokes whose width fell back to the default
    pub defaulted_widths: usize,
}

/// Encode a session payload as JSON text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(payload: &SessionPayload) -> Result<String> {
    serde_json::to_string(&wire::WirePayload::from(payload))
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode one stroke as a standalone JSON object.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_stroke(stroke: &StrokeRecord) -> Result<String> {
    serde_json::to_string(&wire::WireStroke::from(stroke))
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode JSON text into a session payload.
///
/// `default_width` replaces absent or non-positive widths; a non-positive
/// default itself is replaced by [`crate::DEFAULT_STROKE_WIDTH`].
///
/// # Errors
///
/// Returns a [`DecodeError`] when the top-level shape is unusable.
pub fn decode(text: &str, default_width: f32) -> std::result::Result<DecodedPayload, DecodeError> {
    let root: Value = serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))?;
    let Value::Object(root) = root else {
        return Err(DecodeError::NotAnObject);
    };

    let timestamp = root
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let entries = match root.get(EXPORTED_DATA_KEY) {
        None => return Err(DecodeError::MissingExportedData),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(DecodeError::ExportedDataNotArray),
    };
    if entries.is_empty() {
        return Err(DecodeError::Empty);
    }

    let default_width = if default_width.is_finite() && default_width > 0.0 {
        default_width
    } else {
        crate::DEFAULT_STROKE_WIDTH
    };

    let mut decoded = DecodedPayload {
        payload: SessionPayload::new(timestamp, Vec::with_capacity(entries.len())),
        ..DecodedPayload::default()
    };

    for (index, entry) in entries.iter().enumerate() {
        match decode_stroke(entry, default_width) {
            Ok((stroke, defaulted)) => {
                if defaulted {
                    decoded.defaulted_widths += 1;
                }
                decoded.payload.strokes.push(stroke);
            }
            Err(kind) => {
                let error = StrokeError { index, kind };
                tracing::warn!("Skipping {}", error);
                decoded.skipped.push(error);
            }
        }
    }

    tracing::debug!(
        "Decoded {} strokes ({} skipped, {} default widths)",
        decoded.payload.strokes.len(),
        decoded.skipped.len(),
        decoded.defaulted_widths
    );

    Ok(decoded)
}

fn decode_stroke(
    entry: &Value,
    default_width: f32,
) -> std::result::Result<(StrokeRecord, bool), StrokeErrorKind> {
    let Value::Object(entry) = entry else {
        return Err(StrokeErrorKind::NotAnObject);
    };

    let color = decode_color(entry.get("color"))?;
    let (width, defaulted) = resolve_width(entry.get("width"), default_width);
    let positions = decode_positions(entry.get("positions"))?;

    StrokeRecord::new(color, width, positions).map(|stroke| (stroke, defaulted))
}

fn decode_color(color: Option<&Value>) -> std::result::Result<StrokeColor, StrokeErrorKind> {
    let Some(Value::Object(color)) = color else {
        return Err(StrokeErrorKind::MissingColor);
    };

    let kind = color
        .get("type")
        .and_then(Value::as_str)
        .ok_or(StrokeErrorKind::MissingColorType)?;
    if kind != "const" && kind != "gradient" {
        return Err(StrokeErrorKind::UnknownColorType(kind.to_string()));
    }

    let Some(Value::Array(values)) = color.get("value") else {
        return Err(StrokeErrorKind::MissingColorValues);
    };
    if values.is_empty() {
        return Err(StrokeErrorKind::EmptyColorValues);
    }

    let colors = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value
                .as_str()
                .and_then(Rgb24::parse_hex)
                .ok_or_else(|| StrokeErrorKind::InvalidColorValue {
                    index,
                    value: value.to_string(),
                })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if kind == "gradient" {
        let count = colors.len();
        Gradient::new(colors)
            .map(StrokeColor::Gradient)
            .ok_or(StrokeErrorKind::TooFewGradientStops(count))
    } else {
        Ok(StrokeColor::Const(colors[0]))
    }
}

/// Resolve a wire width, returning the width and whether the default was used.
fn resolve_width(width: Option<&Value>, default_width: f32) -> (f32, bool) {
    let explicit = width.and_then(Value::as_f64).map(|w| w as f32);
    match explicit {
        Some(w) if w.is_finite() && w > 0.0 => (w, false),
        Some(w) => {
            tracing::warn!("Invalid line width ({}), using default: {}", w, default_width);
            (default_width, true)
        }
        None => {
            if width.is_some_and(|w| !w.is_null()) {
                tracing::warn!("Non-numeric line width, using default: {}", default_width);
            }
            (default_width, true)
        }
    }
}

fn decode_positions(positions: Option<&Value>) -> std::result::Result<Vec<Vec3>, StrokeErrorKind> {
    let Some(Value::Array(values)) = positions else {
        return Err(StrokeErrorKind::MissingPositions);
    };
    if values.len() % 3 != 0 {
        return Err(StrokeErrorKind::NotTriples(values.len()));
    }
    let points = values.len() / 3;
    if points < StrokeRecord::MIN_POINTS {
        return Err(StrokeErrorKind::TooFewPoints(points));
    }

    let coordinate = |index: usize| {
        values[index]
            .as_f64()
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .ok_or(StrokeErrorKind::InvalidCoordinate(index))
    };

    (0..points)
        .map(|i| {
            let base = i * 3;
            Ok(Vec3::new(
                coordinate(base)?,
                coordinate(base + 1)?,
                coordinate(base + 2)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_WIDTH: f32 = 0.005;

    fn stroke_json(width: &str, positions: &str) -> String {
        format!(
            r#"{{"timestamp":"t","exportedData":[{{"color":{{"type":"const","value":["FF0000"]}},{width}"positions":{positions}}}]}}"#
        )
    }

    fn red_line() -> StrokeRecord {
        StrokeRecord::new(
            StrokeColor::Const(Rgb24::new(255, 0, 0)),
            0.01,
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_end_to_end_example() {
        let text = r#"{"timestamp":"t1","exportedData":[{"color":{"type":"const","value":["FF0000"]},"width":0.01,"positions":[0,0,0, 1,0,0, 1,1,0]}]}"#;
        let decoded = decode(text, DEFAULT_WIDTH).unwrap();

        assert_eq!(decoded.payload.timestamp, "t1");
        assert_eq!(decoded.payload.strokes.len(), 1);
        let stroke = &decoded.payload.strokes[0];
        assert_eq!(stroke.color(), &StrokeColor::Const(Rgb24::new(255, 0, 0)));
        assert_eq!(stroke.width(), 0.01);
        assert_eq!(stroke.positions().len(), 3);
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_strokes() {
        let gradient = Gradient::new(vec![
            Rgb24::new(0, 0, 0),
            Rgb24::new(18, 52, 86),
            Rgb24::new(255, 255, 255),
        ])
        .unwrap();
        let payload = SessionPayload::new(
            "2024/05/01 12:00:00",
            vec![
                red_line(),
                StrokeRecord::new(
                    StrokeColor::Gradient(gradient),
                    0.0035,
                    vec![Vec3::new(-1.25, 0.5, 3.0), Vec3::new(0.1, 0.2, 0.3)],
                )
                .unwrap(),
            ],
        );

        let text = encode(&payload).unwrap();
        let decoded = decode(&text, DEFAULT_WIDTH).unwrap();

        assert_eq!(decoded.payload.strokes.len(), 2);
        assert_eq!(decoded.defaulted_widths, 0);
        for (original, back) in payload.strokes.iter().zip(&decoded.payload.strokes) {
            assert_eq!(original.color(), back.color());
            assert_eq!(original.width(), back.width());
            for (a, b) in original.positions().iter().zip(back.positions()) {
                assert!(a.abs_diff_eq(*b, 1e-6));
            }
        }
    }

    #[test]
    fn test_encode_shape() {
        let text = encode(&SessionPayload::new("t", vec![red_line()])).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["exportedData"][0]["color"]["type"], "const");
        assert_eq!(value["exportedData"][0]["color"]["value"][0], "FF0000");
        assert_eq!(
            value["exportedData"][0]["positions"].as_array().unwrap().len(),
            9
        );
    }

    #[test]
    fn test_width_defaulting() {
        for width in ["", r#""width":0,"#, r#""width":-1,"#, r#""width":null,"#, r#""width":"x","#] {
            let text = stroke_json(width, "[0,0,0,1,1,1]");
            let decoded = decode(&text, DEFAULT_WIDTH).unwrap();
            assert_eq!(decoded.payload.strokes[0].width(), DEFAULT_WIDTH, "{width}");
            assert_eq!(decoded.defaulted_widths, 1);
        }

        let decoded = decode(&stroke_json(r#""width":0.01,"#, "[0,0,0,1,1,1]"), DEFAULT_WIDTH).unwrap();
        assert_eq!(decoded.payload.strokes[0].width(), 0.01);

        let decoded = decode(&stroke_json(r#""width":2,"#, "[0,0,0,1,1,1]"), DEFAULT_WIDTH).unwrap();
        assert_eq!(decoded.payload.strokes[0].width(), 2.0);
    }

    #[test]
    fn test_non_positive_default_width_is_replaced() {
        let decoded = decode(&stroke_json("", "[0,0,0,1,1,1]"), 0.0).unwrap();
        assert_eq!(decoded.payload.strokes[0].width(), crate::DEFAULT_STROKE_WIDTH);
    }

    #[test]
    fn test_position_validity() {
        let five = decode(&stroke_json("", "[0,0,0,1,1]"), DEFAULT_WIDTH).unwrap();
        assert!(five.payload.strokes.is_empty());
        assert_eq!(five.skipped[0].kind, StrokeErrorKind::NotTriples(5));

        let three = decode(&stroke_json("", "[0,0,0]"), DEFAULT_WIDTH).unwrap();
        assert!(three.payload.strokes.is_empty());
        assert_eq!(three.skipped[0].kind, StrokeErrorKind::TooFewPoints(1));

        let six = decode(&stroke_json("", "[0,0,0,1.5,1,1]"), DEFAULT_WIDTH).unwrap();
        assert_eq!(six.payload.strokes.len(), 1);
        assert_eq!(six.payload.strokes[0].positions()[1], Vec3::new(1.5, 1.0, 1.0));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let decoded = decode(&stroke_json("", r#"[0,0,0,1,"a",1]"#), DEFAULT_WIDTH).unwrap();
        assert_eq!(decoded.skipped[0].kind, StrokeErrorKind::InvalidCoordinate(4));
    }

    #[test]
    fn test_bad_stroke_skipped_others_kept() {
        let text = r#"{"timestamp":"t","exportedData":[
            {"color":{"type":"const","value":["ZZ0000"]},"positions":[0,0,0,1,1,1]},
            {"color":{"type":"gradient","value":["FF0000"]},"positions":[0,0,0,1,1,1]},
            {"color":{"type":"rainbow","value":["FF0000"]},"positions":[0,0,0,1,1,1]},
            "not a stroke",
            {"color":{"type":"gradient","value":["ff0000","00FF00"]},"positions":[0,0,0,1,1,1]}
        ]}"#;
        let decoded = decode(text, DEFAULT_WIDTH).unwrap();

        assert_eq!(decoded.payload.strokes.len(), 1);
        assert_eq!(decoded.skipped.len(), 4);
        assert_eq!(decoded.skipped[0].index, 0);
        assert!(matches!(
            decoded.skipped[0].kind,
            StrokeErrorKind::InvalidColorValue { index: 0, .. }
        ));
        assert_eq!(decoded.skipped[1].kind, StrokeErrorKind::TooFewGradientStops(1));
        assert_eq!(
            decoded.skipped[2].kind,
            StrokeErrorKind::UnknownColorType("rainbow".to_string())
        );
        assert_eq!(decoded.skipped[3].kind, StrokeErrorKind::NotAnObject);
        assert_eq!(decoded.payload.strokes[0].color().kind(), "gradient");
    }

    #[test]
    fn test_top_level_errors() {
        assert!(matches!(decode("not json", 0.005), Err(DecodeError::Json(_))));
        assert_eq!(decode("[]", 0.005).unwrap_err(), DecodeError::NotAnObject);
        assert_eq!(
            decode(r#"{"timestamp":"t"}"#, 0.005).unwrap_err(),
            DecodeError::MissingExportedData
        );
        assert_eq!(
            decode(r#"{"exportedData":{}}"#, 0.005).unwrap_err(),
            DecodeError::ExportedDataNotArray
        );
        assert_eq!(
            decode(r#"{"exportedData":[]}"#, 0.005).unwrap_err(),
            DecodeError::Empty
        );
    }

    #[test]
    fn test_missing_timestamp_tolerated() {
        let text = r#"{"exportedData":[{"color":{"type":"const","value":["000000"]},"positions":[0,0,0,1,1,1]}]}"#;
        let decoded = decode(text, DEFAULT_WIDTH).unwrap();
        assert_eq!(decoded.payload.timestamp, "");
        assert_eq!(decoded.payload.strokes.len(), 1);
    }

    #[test]
    fn test_group_by_color() {
        let blue = StrokeRecord::new(
            StrokeColor::Const(Rgb24::new(0, 0, 255)),
            0.02,
            vec![Vec3::ZERO, Vec3::Y],
        )
        .unwrap();
        let thin_red = StrokeRecord::new(
            StrokeColor::Const(Rgb24::new(255, 0, 0)),
            0.005,
            vec![Vec3::ZERO, Vec3::Z],
        )
        .unwrap();
        let payload = SessionPayload::new("t", vec![red_line(), blue, red_line(), thin_red]);

        let by_color = payload.group_by_color();
        assert_eq!(by_color.len(), 2);
        assert_eq!(by_color[0].key.color, Rgb24::new(255, 0, 0));
        assert_eq!(by_color[0].strokes.len(), 3);
        assert_eq!(by_color[0].key.label(), "Group_FF0000");

        let by_width = payload.group_by_color_and_width();
        assert_eq!(by_width.len(), 3);
        assert_eq!(by_width[0].strokes.len(), 2);
        assert_eq!(by_width[0].key.width(), Some(0.01));
    }

    #[test]
    fn test_centroid() {
        let stroke = red_line();
        let c = stroke.centroid();
        assert!(c.abs_diff_eq(Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0), 1e-6));
    }

    #[test]
    fn test_constructor_rejects_single_point() {
        let err = StrokeRecord::new(StrokeColor::Const(Rgb24::new(0, 0, 0)), 0.01, vec![Vec3::ZERO])
            .unwrap_err();
        assert_eq!(err, StrokeErrorKind::TooFewPoints(1));
    }
}
