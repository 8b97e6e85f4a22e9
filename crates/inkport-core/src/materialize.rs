//! Turning decoded strokes into renderer objects.
//!
//! Two placements are supported:
//!
//! - **World-fixed**: strokes are grouped (by color, optionally by width),
//!   each group node sits at the centroid of its strokes' centroids and each
//!   stroke's points are recentered on the stroke's own centroid. Offsets
//!   and points are multiplied by the scale factor, so the drawing scales
//!   about each group's center.
//! - **Pickup**: every stroke goes straight into the pickup container with
//!   points recentered on the centroid of all points in the payload.
//!
//! Width resources are created lazily and shared by strokes with the same
//! primary color and scaled width for the lifetime of one [`ImportBatch`].

use std::collections::HashMap;

use glam::Vec3;

use crate::codec::{Rgb24, SessionPayload, StrokeGroup, StrokeRecord};
use crate::render::{Container, NodeId, Parent, RenderColor, RenderError, ResourceId, StrokeRenderer};

/// Where strokes are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Fixed in the world, grouped
    #[default]
    WorldFixed,
    /// Inside the user-held pickup container
    Pickup,
}

/// How world-fixed strokes are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// One group per primary color
    #[default]
    Color,
    /// One group per primary color and width
    ColorAndWidth,
    /// No group nodes
    None,
}

/// Options for one materialization pass.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeOptions {
    /// Multiplies geometry offsets and widths
    pub scale: f32,
    /// Target container
    pub placement: Placement,
    /// Group layout for world-fixed placement
    pub grouping: Grouping,
    /// Render layer assigned to strokes
    pub layer: u32,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            placement: Placement::WorldFixed,
            grouping: Grouping::Color,
            layer: 0,
        }
    }
}

/// Outcome of materializing a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Strokes created
    pub created: usize,
    /// Strokes that failed and were discarded
    pub failed: usize,
    /// Group nodes created
    pub groups: usize,
    /// Width resources generated
    pub resources: usize,
}

/// How a stroke's points are recentered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Around the stroke's own centroid; the node is offset by
    /// `(centroid - origin) * scale` from its parent
    OwnCentroid {
        /// Position of the parent node in payload space
        origin: Vec3,
    },
    /// Around a shared centroid; the node sits at the parent's origin
    Shared(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ResourceKey {
    color: Rgb24,
    width_bits: u32,
}

/// One import batch: owns the width resource cache until dropped.
pub struct ImportBatch<'r, R: StrokeRenderer + ?Sized> {
    renderer: &'r mut R,
    options: MaterializeOptions,
    resources: HashMap<ResourceKey, ResourceId>,
    report: MaterializeReport,
}

impl<'r, R: StrokeRenderer + ?Sized> ImportBatch<'r, R> {
    /// Start a batch against `renderer`.
    pub fn new(renderer: &'r mut R, options: MaterializeOptions) -> Self {
        Self {
            renderer,
            options,
            resources: HashMap::new(),
            report: MaterializeReport::default(),
        }
    }

    /// Materialize every stroke of `payload` and finish the batch.
    pub fn run(mut self, payload: &SessionPayload) -> MaterializeReport {
        match self.options.placement {
            Placement::Pickup => {
                let center = payload_centroid(payload);
                for stroke in &payload.strokes {
                    self.place(stroke, Parent::Container(Container::Pickup), Anchor::Shared(center));
                }
            }
            Placement::WorldFixed => {
                let world = Parent::Container(Container::World);
                let groups = match self.options.grouping {
                    Grouping::Color => payload.group_by_color(),
                    Grouping::ColorAndWidth => payload.group_by_color_and_width(),
                    Grouping::None => {
                        for stroke in &payload.strokes {
                            self.place(stroke, world, Anchor::OwnCentroid { origin: Vec3::ZERO });
                        }
                        Vec::new()
                    }
                };
                for group in &groups {
                    self.place_group(group, world);
                }
            }
        }

        tracing::info!(
            "Materialized {} strokes ({} failed, {} groups, {} width resources)",
            self.report.created,
            self.report.failed,
            self.report.groups,
            self.report.resources
        );
        self.report
    }

    fn place_group(&mut self, group: &StrokeGroup<'_>, parent: Parent) {
        let center = group_centroid(group);
        let node = match self
            .renderer
            .create_group(parent, &group.key.label(), center)
        {
            Ok(node) => node,
            Err(e) => {
                tracing::error!("Failed to create group {}: {}", group.key.label(), e);
                self.report.failed += group.strokes.len();
                return;
            }
        };
        self.report.groups += 1;

        for stroke in &group.strokes {
            self.place(stroke, Parent::Node(node), Anchor::OwnCentroid { origin: center });
        }
    }

    /// Materialize one stroke. A failure discards only this stroke.
    pub fn place(&mut self, stroke: &StrokeRecord, parent: Parent, anchor: Anchor) -> Option<NodeId> {
        match self.build(stroke, parent, anchor) {
            Ok(node) => {
                self.report.created += 1;
                Some(node)
            }
            Err(e) => {
                tracing::error!("Failed to materialize stroke: {}", e);
                self.report.failed += 1;
                None
            }
        }
    }

    fn build(
        &mut self,
        stroke: &StrokeRecord,
        parent: Parent,
        anchor: Anchor,
    ) -> Result<NodeId, RenderError> {
        let scale = self.options.scale;
        let width = stroke.width() * scale;
        let node = self
            .renderer
            .instantiate_stroke(parent, &format!("Line_Width{width:.3}"))?;

        let result = self.configure(node, stroke, anchor, width);
        if result.is_err() {
            self.renderer.destroy(node);
        }
        result.map(|()| node)
    }

    fn configure(
        &mut self,
        node: NodeId,
        stroke: &StrokeRecord,
        anchor: Anchor,
        width: f32,
    ) -> Result<(), RenderError> {
        let scale = self.options.scale;
        let (center, offset) = match anchor {
            Anchor::OwnCentroid { origin } => {
                let centroid = stroke.centroid();
                (centroid, (centroid - origin) * scale)
            }
            Anchor::Shared(center) => (center, Vec3::ZERO),
        };
        let points: Vec<Vec3> = stroke
            .positions()
            .iter()
            .map(|p| (*p - center) * scale)
            .collect();

        self.renderer.set_local_position(node, offset)?;
        self.renderer.set_positions(node, &points)?;
        self.renderer.set_color(node, &RenderColor::from(stroke.color()))?;
        let resource = self.width_resource(stroke.color().primary(), width)?;
        self.renderer.set_width_resource(node, resource)?;
        self.renderer.set_layer(node, self.options.layer)
    }

    fn width_resource(&mut self, color: Rgb24, width: f32) -> Result<ResourceId, RenderError> {
        let key = ResourceKey {
            color,
            width_bits: width.to_bits(),
        };
        if let Some(id) = self.resources.get(&key) {
            return Ok(*id);
        }
        let id = self.renderer.create_width_resource(width)?;
        self.resources.insert(key, id);
        self.report.resources += 1;
        Ok(id)
    }
}

/// Materialize `payload` into `renderer` as one batch.
pub fn materialize<R: StrokeRenderer + ?Sized>(
    renderer: &mut R,
    payload: &SessionPayload,
    options: MaterializeOptions,
) -> MaterializeReport {
    ImportBatch::new(renderer, options).run(payload)
}

/// Centroid of every point in the payload.
#[must_use]
pub fn payload_centroid(payload: &SessionPayload) -> Vec3 {
    let (sum, count) = payload
        .strokes
        .iter()
        .flat_map(StrokeRecord::positions)
        .fold((Vec3::ZERO, 0usize), |(sum, count), p| (sum + *p, count + 1));
    if count == 0 {
        Vec3::ZERO
    } else {
        sum / count as f32
    }
}

/// Centroid of the stroke centroids in a group.
#[must_use]
pub fn group_centroid(group: &StrokeGroup<'_>) -> Vec3 {
    if group.strokes.is_empty() {
        return Vec3::ZERO;
    }
    group.strokes.iter().map(|s| s.centroid()).sum::<Vec3>() / group.strokes.len() as f32
}
