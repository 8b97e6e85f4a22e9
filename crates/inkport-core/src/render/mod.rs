//! Rendering boundary.
//!
//! The core never draws anything. It hands decoded geometry, colors and
//! width resources to a [`StrokeRenderer`], which owns the actual scene.
//! [`SceneGraph`] is an in-memory implementation used for offline imports
//! and tests.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod scene;

pub use scene::{SceneGraph, SceneNode, StrokeTemplate};

use crate::codec::{Rgb24, StrokeColor};

/// Handle to an object created by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle to a width-keyed rendering resource (a material variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

/// Top-level containers a board materializes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// Fixed in the world
    World,
    /// Held and moved by a user
    Pickup,
}

/// Where a new object is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parent {
    /// Directly under a container
    Container(Container),
    /// Under another node
    Node(NodeId),
}

/// Color as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderColor {
    /// Same color at both ends
    Solid(Rgb24),
    /// Color keys at parametric positions in `[0, 1]`
    Gradient(Vec<(f32, Rgb24)>),
}

impl From<&StrokeColor> for RenderColor {
    fn from(color: &StrokeColor) -> Self {
        match color {
            StrokeColor::Const(rgb) => Self::Solid(*rgb),
            StrokeColor::Gradient(gradient) => Self::Gradient(gradient.keys().collect()),
        }
    }
}

/// Failures reported by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The stroke template lacks a required component
    #[error("template is missing the {0} component")]
    MissingComponent(&'static str),
    /// A handle does not refer to a live object
    #[error("unknown {0}")]
    UnknownNode(NodeId),
    /// A resource handle does not refer to a live resource
    #[error("unknown resource {0}")]
    UnknownResource(u64),
}

/// Operations the materializer and board need from a scene.
pub trait StrokeRenderer {
    /// Create an empty grouping node.
    fn create_group(
        &mut self,
        parent: Parent,
        name: &str,
        local_position: Vec3,
    ) -> Result<NodeId, RenderError>;

    /// Instantiate one stroke object from the configured template.
    fn instantiate_stroke(&mut self, parent: Parent, name: &str) -> Result<NodeId, RenderError>;

    /// Move a node relative to its parent.
    fn set_local_position(&mut self, node: NodeId, position: Vec3) -> Result<(), RenderError>;

    /// Replace a stroke's points (local to the stroke node).
    fn set_positions(&mut self, node: NodeId, points: &[Vec3]) -> Result<(), RenderError>;

    /// Set a stroke's color.
    fn set_color(&mut self, node: NodeId, color: &RenderColor) -> Result<(), RenderError>;

    /// Generate a rendering resource for the given width.
    fn create_width_resource(&mut self, width: f32) -> Result<ResourceId, RenderError>;

    /// Attach a width resource to a stroke.
    fn set_width_resource(&mut self, node: NodeId, resource: ResourceId)
        -> Result<(), RenderError>;

    /// Put a stroke on a render layer.
    fn set_layer(&mut self, _node: NodeId, _layer: u32) -> Result<(), RenderError> {
        Ok(())
    }

    /// Destroy a node and everything under it.
    ///
    /// Width resources are left alive; an import batch may still hold them.
    fn destroy(&mut self, node: NodeId);

    /// Top-level node of `container` with the given name.
    fn find_child(&self, container: Container, name: &str) -> Option<NodeId>;

    /// Destroy every node in a container and drop unused resources.
    fn clear(&mut self, container: Container);

    /// Show or hide the pickup container. Activation resets its pose.
    fn set_pickup_active(&mut self, active: bool);

    /// Whether a pickup container exists at all.
    fn has_pickup(&self) -> bool {
        true
    }
}
