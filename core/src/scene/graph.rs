// Arena-based scene graph: nodes in a Vec, tree structure via indices.

use glam::{Mat4, Quat, Vec3};

use crate::scene::mesh::Mesh;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Link,
    Joint,
    Visual,
}

/// A transformable node.
///
/// Local transform is position + rotation (scale is always 1); the cached
/// world matrix is the product of the local transforms from the root down.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: Vec3,
    pub rotation: Quat,
    pub world: Mat4,
    pub mesh: Option<Mesh>,
}

impl SceneNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            world: Mat4::IDENTITY,
            mesh: None,
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Rooted tree of scene nodes. Node 0 is always the scene root.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::new("scene", NodeKind::Root)],
        }
    }

    pub const ROOT: NodeId = 0;

    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode::new(name, kind));
        id
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child].parent {
            self.nodes[old].children.retain(|&c| c != child);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Recompute the world matrix of `id` and its whole subtree.
    ///
    /// Called immediately after any accepted local-transform change so that
    /// downstream readers always observe consistent world state.
    pub fn update_world(&mut self, id: NodeId) {
        let parent_world = match self.nodes[id].parent {
            Some(p) => self.nodes[p].world,
            None => Mat4::IDENTITY,
        };
        let mut stack = vec![(id, parent_world)];
        while let Some((n, parent_world)) = stack.pop() {
            let world = parent_world * self.nodes[n].local_matrix();
            self.nodes[n].world = world;
            for &c in &self.nodes[n].children {
                stack.push((c, world));
            }
        }
    }

    /// Recompute every world matrix from the root down.
    pub fn update_world_all(&mut self) {
        self.update_world(Self::ROOT);
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
