//! Payload summaries.
//!
//! Groups decoded strokes by their first color value and reports what an
//! import would create, without touching a renderer.

use serde::Serialize;

use crate::board::Bounds;
use crate::codec::{Rgb24, SessionPayload};

/// Summary of one color group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    /// First color value shared by the group
    pub color: Rgb24,
    /// Node name the group would get
    pub label: String,
    /// Strokes in the group
    pub strokes: usize,
    /// Strokes with a gradient color
    pub gradients: usize,
    /// Largest number of gradient stops in the group
    pub max_stops: usize,
    /// Distinct widths, ascending
    pub widths: Vec<f32>,
    /// Points across the group
    pub points: usize,
}

/// Summary of a whole payload.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Payload timestamp
    pub timestamp: String,
    /// Strokes in the payload
    pub strokes: usize,
    /// Points in the payload
    pub points: usize,
    /// Per-color groups in first-seen order
    pub groups: Vec<GroupSummary>,
    /// Bounding box of every point
    pub bounds: Option<Bounds>,
}

impl Summary {
    /// Longest bounding-box side after scaling.
    #[must_use]
    pub fn longest_side(&self, scale: f32) -> f32 {
        self.bounds.map_or(0.0, |b| b.longest_side() * scale.abs())
    }
}

/// Summarize `payload`.
#[must_use]
pub fn summarize(payload: &SessionPayload) -> Summary {
    let groups = payload
        .group_by_color()
        .into_iter()
        .map(|group| {
            let mut widths: Vec<f32> = Vec::new();
            for stroke in &group.strokes {
                if !widths.contains(&stroke.width()) {
                    widths.push(stroke.width());
                }
            }
            widths.sort_by(f32::total_cmp);

            GroupSummary {
                color: group.key.color,
                label: group.key.label(),
                strokes: group.strokes.len(),
                gradients: group
                    .strokes
                    .iter()
                    .filter(|s| s.color().kind() == "gradient")
                    .count(),
                max_stops: group
                    .strokes
                    .iter()
                    .map(|s| s.color().values().len())
                    .max()
                    .unwrap_or(0),
                widths,
                points: group.strokes.iter().map(|s| s.positions().len()).sum(),
            }
        })
        .collect();

    Summary {
        timestamp: payload.timestamp.clone(),
        strokes: payload.strokes.len(),
        points: payload.strokes.iter().map(|s| s.positions().len()).sum(),
        groups,
        bounds: Bounds::of_payload(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn test_summarize_groups_by_first_color() {
        let text = r#"{"timestamp":"t","exportedData":[
            {"color":{"type":"const","value":["FF0000"]},"width":0.02,"positions":[0,0,0,1,0,0]},
            {"color":{"type":"gradient","value":["FF0000","00FF00","0000FF"]},"width":0.01,"positions":[0,0,0,0,3,0,0,3,1]},
            {"color":{"type":"const","value":["0000FF"]},"positions":[0,0,0,0,0,2]}
        ]}"#;
        let payload = codec::decode(text, 0.005).unwrap().payload;
        let summary = summarize(&payload);

        assert_eq!(summary.strokes, 3);
        assert_eq!(summary.points, 7);
        assert_eq!(summary.groups.len(), 2);

        let red = &summary.groups[0];
        assert_eq!(red.label, "Group_FF0000");
        assert_eq!(red.strokes, 2);
        assert_eq!(red.gradients, 1);
        assert_eq!(red.max_stops, 3);
        assert_eq!(red.widths, vec![0.01, 0.02]);

        assert_eq!(summary.longest_side(1.0), 3.0);
        assert_eq!(summary.longest_side(2.0), 6.0);
    }
}
