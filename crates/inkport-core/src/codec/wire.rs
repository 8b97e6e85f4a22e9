//! Serde shapes of the session payload as it appears on the wire.
//!
//! Only the encoding side is derived. Decoding walks a `serde_json::Value`
//! so that a bad stroke can be skipped without rejecting its neighbours.

use serde::Serialize;

use super::{SessionPayload, StrokeRecord};

/// Top-level key holding the stroke array.
pub const EXPORTED_DATA_KEY: &str = "exportedData";

#[derive(Serialize)]
pub(crate) struct WirePayload<'a> {
    pub timestamp: &'a str,
    #[serde(rename = "exportedData")]
    pub exported_data: Vec<WireStroke>,
}

#[derive(Serialize)]
pub(crate) struct WireStroke {
    pub color: WireColor,
    pub width: f32,
    pub positions: Vec<f32>,
}

#[derive(Serialize)]
pub(crate) struct WireColor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: Vec<String>,
}

impl From<&StrokeRecord> for WireStroke {
    fn from(stroke: &StrokeRecord) -> Self {
        Self {
            color: WireColor {
                kind: stroke.color().kind(),
                value: stroke.color().values().iter().map(|c| c.to_hex()).collect(),
            },
            width: stroke.width(),
            positions: stroke
                .positions()
                .iter()
                .flat_map(|p| [p.x, p.y, p.z])
                .collect(),
        }
    }
}

impl<'a> From<&'a SessionPayload> for WirePayload<'a> {
    fn from(payload: &'a SessionPayload) -> Self {
        Self {
            timestamp: &payload.timestamp,
            exported_data: payload.strokes.iter().map(WireStroke::from).collect(),
        }
    }
}
