//! Size gate for freshly fetched payloads.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::codec::SessionPayload;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest coordinate on each axis
    pub min: Vec3,
    /// Largest coordinate on each axis
    pub max: Vec3,
}

impl Bounds {
    /// Bounds of every point in `payload`, or `None` if it has no points.
    #[must_use]
    pub fn of_payload(payload: &SessionPayload) -> Option<Self> {
        Self::of_points(payload.strokes.iter().flat_map(|s| s.positions().iter().copied()))
    }

    /// Bounds of a point set, or `None` if it is empty.
    pub fn of_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Longest side.
    #[must_use]
    pub fn longest_side(&self) -> f32 {
        self.size().max_element()
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Outcome of the size gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Small enough to import
    Pass,
    /// Longest scaled side exceeds the limit
    Exceeded {
        /// Longest side after scaling
        longest_side: f32,
    },
}

/// Check the scaled bounding box of `payload` against `max_size`.
#[must_use]
pub fn check(payload: &SessionPayload, scale: f32, max_size: f32) -> GateDecision {
    let Some(bounds) = Bounds::of_payload(payload) else {
        return GateDecision::Pass;
    };
    let longest_side = bounds.longest_side() * scale.abs();
    if longest_side > max_size {
        GateDecision::Exceeded { longest_side }
    } else {
        GateDecision::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Rgb24, StrokeColor, StrokeRecord};

    fn payload(points: Vec<Vec3>) -> SessionPayload {
        SessionPayload::new(
            "t",
            vec![StrokeRecord::new(StrokeColor::Const(Rgb24::new(0, 0, 0)), 0.01, points).unwrap()],
        )
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::of_points([Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, 0.0, 1.0)]).unwrap();
        assert_eq!(bounds.size(), Vec3::new(4.0, 2.0, 1.0));
        assert_eq!(bounds.longest_side(), 4.0);
        assert_eq!(bounds.center(), Vec3::new(1.0, 1.0, 0.5));
        assert!(Bounds::of_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_gate_applies_scale() {
        let p = payload(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]);

        assert_eq!(check(&p, 1.0, 5.0), GateDecision::Pass);
        assert_eq!(
            check(&p, 2.0, 5.0),
            GateDecision::Exceeded { longest_side: 8.0 }
        );
    }

    #[test]
    fn test_gate_limit_is_inclusive() {
        let p = payload(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)]);
        assert_eq!(check(&p, 1.0, 5.0), GateDecision::Pass);
    }
}
