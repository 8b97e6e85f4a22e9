//! In-memory scene graph implementing [`StrokeRenderer`].

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{Container, NodeId, Parent, RenderColor, RenderError, ResourceId, StrokeRenderer};
use crate::error::{Error, Result};

/// Template strokes are instantiated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeTemplate {
    /// Template name
    pub name: String,
    /// Whether the template carries a line component
    pub has_line_component: bool,
}

impl Default for StrokeTemplate {
    fn default() -> Self {
        Self {
            name: "InkLine".to_string(),
            has_line_component: true,
        }
    }
}

/// What a scene node is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Grouping node
    Group,
    /// Renderable stroke
    Stroke {
        /// Points local to the node
        points: Vec<Vec3>,
        /// Assigned color
        color: Option<RenderColor>,
        /// Assigned width resource
        resource: Option<ResourceId>,
        /// Render layer
        layer: u32,
    },
}

/// One node of the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    /// Handle
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Attachment point
    pub parent: Parent,
    /// Offset from the parent
    pub local_position: Vec3,
    /// Node payload
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// A generated width resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidthResourceEntry {
    /// Handle
    pub id: ResourceId,
    /// Line width the resource renders
    pub width: f32,
}

/// Pickup container state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickupState {
    /// Whether the container is shown
    pub active: bool,
    /// How many times its pose was reset on activation
    pub pose_resets: u32,
}

/// In-memory scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneGraph {
    template: StrokeTemplate,
    has_pickup: bool,
    nodes: BTreeMap<NodeId, SceneNode>,
    resources: Vec<WidthResourceEntry>,
    pickup: PickupState,
    next_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(StrokeTemplate::default())
    }
}

impl SceneGraph {
    /// Create an empty scene that instantiates strokes from `template`.
    #[must_use]
    pub fn new(template: StrokeTemplate) -> Self {
        Self {
            template,
            has_pickup: true,
            nodes: BTreeMap::new(),
            resources: Vec::new(),
            pickup: PickupState::default(),
            next_id: 1,
        }
    }

    /// Remove the pickup container from this scene.
    #[must_use]
    pub fn without_pickup(mut self) -> Self {
        self.has_pickup = false;
        self
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    /// Direct children of `parent`.
    pub fn children(&self, parent: Parent) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values().filter(move |n| n.parent == parent)
    }

    /// Stroke nodes inside `container`, at any depth.
    pub fn strokes_in(&self, container: Container) -> impl Iterator<Item = &SceneNode> + '_ {
        self.nodes.values().filter(move |n| {
            matches!(n.kind, NodeKind::Stroke { .. }) && self.root_of(n.id) == Some(container)
        })
    }

    /// Number of stroke nodes across all containers.
    #[must_use]
    pub fn stroke_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Stroke { .. }))
            .count()
    }

    /// Generated width resources.
    #[must_use]
    pub fn resources(&self) -> &[WidthResourceEntry] {
        &self.resources
    }

    /// Pickup container state.
    #[must_use]
    pub fn pickup(&self) -> &PickupState {
        &self.pickup
    }

    /// Container a node ultimately hangs under.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> Option<Container> {
        let mut current = self.nodes.get(&id)?;
        loop {
            match current.parent {
                Parent::Container(container) => return Some(container),
                Parent::Node(parent) => current = self.nodes.get(&parent)?,
            }
        }
    }

    /// Position of a node relative to its container.
    #[must_use]
    pub fn container_position(&self, id: NodeId) -> Option<Vec3> {
        let mut current = self.nodes.get(&id)?;
        let mut position = current.local_position;
        while let Parent::Node(parent) = current.parent {
            current = self.nodes.get(&parent)?;
            position += current.local_position;
        }
        Some(position)
    }

    /// A stroke's points relative to its container.
    #[must_use]
    pub fn container_points(&self, id: NodeId) -> Option<Vec<Vec3>> {
        let origin = self.container_position(id)?;
        match &self.nodes.get(&id)?.kind {
            NodeKind::Stroke { points, .. } => Some(points.iter().map(|p| origin + *p).collect()),
            NodeKind::Group => None,
        }
    }

    /// Serialize the scene as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn insert(&mut self, parent: Parent, name: &str, position: Vec3, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                id,
                name: name.to_string(),
                parent,
                local_position: position,
                kind,
            },
        );
        id
    }

    fn check_parent(&self, parent: Parent) -> std::result::Result<(), RenderError> {
        match parent {
            Parent::Node(id) if !self.nodes.contains_key(&id) => Err(RenderError::UnknownNode(id)),
            _ => Ok(()),
        }
    }

    fn stroke_mut(
        &mut self,
        node: NodeId,
    ) -> std::result::Result<&mut NodeKind, RenderError> {
        match self.nodes.get_mut(&node) {
            Some(SceneNode {
                kind: kind @ NodeKind::Stroke { .. },
                ..
            }) => Ok(kind),
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    fn drop_unused_resources(&mut self) {
        let used: Vec<ResourceId> = self
            .nodes
            .values()
            .filter_map(|n| match n.kind {
                NodeKind::Stroke { resource, .. } => resource,
                NodeKind::Group => None,
            })
            .collect();
        self.resources.retain(|r| used.contains(&r.id));
    }
}

impl StrokeRenderer for SceneGraph {
    fn create_group(
        &mut self,
        parent: Parent,
        name: &str,
        local_position: Vec3,
    ) -> std::result::Result<NodeId, RenderError> {
        self.check_parent(parent)?;
        Ok(self.insert(parent, name, local_position, NodeKind::Group))
    }

    fn instantiate_stroke(
        &mut self,
        parent: Parent,
        name: &str,
    ) -> std::result::Result<NodeId, RenderError> {
        self.check_parent(parent)?;
        if !self.template.has_line_component {
            return Err(RenderError::MissingComponent("line renderer"));
        }
        Ok(self.insert(
            parent,
            name,
            Vec3::ZERO,
            NodeKind::Stroke {
                points: Vec::new(),
                color: None,
                resource: None,
                layer: 0,
            },
        ))
    }

    fn set_local_position(
        &mut self,
        node: NodeId,
        position: Vec3,
    ) -> std::result::Result<(), RenderError> {
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(RenderError::UnknownNode(node))?;
        entry.local_position = position;
        Ok(())
    }

    fn set_positions(
        &mut self,
        node: NodeId,
        new_points: &[Vec3],
    ) -> std::result::Result<(), RenderError> {
        if let NodeKind::Stroke { points, .. } = self.stroke_mut(node)? {
            *points = new_points.to_vec();
        }
        Ok(())
    }

    fn set_color(
        &mut self,
        node: NodeId,
        new_color: &RenderColor,
    ) -> std::result::Result<(), RenderError> {
        if let NodeKind::Stroke { color, .. } = self.stroke_mut(node)? {
            *color = Some(new_color.clone());
        }
        Ok(())
    }

    fn create_width_resource(&mut self, width: f32) -> std::result::Result<ResourceId, RenderError> {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.resources.push(WidthResourceEntry { id, width });
        Ok(id)
    }

    fn set_width_resource(
        &mut self,
        node: NodeId,
        new_resource: ResourceId,
    ) -> std::result::Result<(), RenderError> {
        if !self.resources.iter().any(|r| r.id == new_resource) {
            return Err(RenderError::UnknownResource(new_resource.0));
        }
        if let NodeKind::Stroke { resource, .. } = self.stroke_mut(node)? {
            *resource = Some(new_resource);
        }
        Ok(())
    }

    fn set_layer(&mut self, node: NodeId, new_layer: u32) -> std::result::Result<(), RenderError> {
        if let NodeKind::Stroke { layer, .. } = self.stroke_mut(node)? {
            *layer = new_layer;
        }
        Ok(())
    }

    fn destroy(&mut self, node: NodeId) {
        let mut doomed = vec![node];
        let mut index = 0;
        while index < doomed.len() {
            let current = doomed[index];
            doomed.extend(
                self.nodes
                    .values()
                    .filter(|n| n.parent == Parent::Node(current))
                    .map(|n| n.id),
            );
            index += 1;
        }
        for id in doomed {
            self.nodes.remove(&id);
        }
    }

    fn find_child(&self, container: Container, name: &str) -> Option<NodeId> {
        self.children(Parent::Container(container))
            .find(|n| n.name == name)
            .map(|n| n.id)
    }

    fn clear(&mut self, container: Container) {
        let roots: Vec<NodeId> = self
            .children(Parent::Container(container))
            .map(|n| n.id)
            .collect();
        tracing::debug!("Clearing {} nodes from {:?}", roots.len(), container);
        for id in roots {
            self.destroy(id);
        }
        self.drop_unused_resources();
    }

    fn set_pickup_active(&mut self, active: bool) {
        if !self.has_pickup {
            return;
        }
        if active && !self.pickup.active {
            self.pickup.pose_resets += 1;
        }
        self.pickup.active = active;
        if !active {
            self.clear(Container::Pickup);
        }
    }

    fn has_pickup(&self) -> bool {
        self.has_pickup
    }
}
