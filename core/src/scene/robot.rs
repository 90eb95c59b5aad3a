// Topology -> scene tree construction and incremental pose update.

use std::collections::{BTreeMap, HashMap};

use glam::{Quat, Vec3};
use tracing::{debug, warn};

use crate::scene::graph::{NodeId, NodeKind, SceneGraph};
use crate::scene::mesh::Mesh;
use crate::scene::SceneError;
use crate::topology::{JointLimits, JointType, Topology};

/// Per-joint state bound to a scene node.
///
/// The base transform is the joint node's local transform at value 0,
/// recorded once after construction. Every update recomputes the local
/// transform from this snapshot rather than accumulating deltas, so repeated
/// updates cannot drift.
#[derive(Debug, Clone)]
struct JointBinding {
    node: NodeId,
    joint_type: JointType,
    axis: Vec3,
    limits: Option<JointLimits>,
    base_position: Vec3,
    base_rotation: Quat,
    value: f64,
}

/// A robot's scene tree plus its current joint values.
///
/// Built once from an immutable [`Topology`]; thereafter mutated only through
/// [`set`](Self::set) / [`set_all`](Self::set_all). Ownership is exclusive:
/// the update loop that holds the scene is the single writer.
#[derive(Debug, Clone)]
pub struct RobotScene {
    graph: SceneGraph,
    joints: BTreeMap<String, JointBinding>,
    root_link: String,
}

impl RobotScene {
    /// Construct the scene tree from a topology and initial joint positions
    /// (joints absent from `initial` start at 0).
    ///
    /// Construction order: all link nodes first, then joints wiring
    /// parent-link -> joint -> child-link, then root attachment, then the
    /// base-transform snapshot, then the initial positions.
    pub fn build(
        topology: &Topology,
        initial: &HashMap<String, f64>,
    ) -> Result<Self, SceneError> {
        if topology.links.is_empty() {
            return Err(SceneError::EmptyTopology);
        }
        let root_link = topology
            .root_link()
            .ok_or(SceneError::NoRootLink)?
            .name
            .clone();

        let mut graph = SceneGraph::new();

        // Link nodes first so joints can resolve parent/child by name
        let mut link_nodes: HashMap<String, NodeId> = HashMap::new();
        for link in topology.links.values() {
            let id = graph.add_node(link.name.clone(), NodeKind::Link);
            if let Some(visual) = &link.visual {
                let vis = graph.add_node(format!("{}/visual", link.name), NodeKind::Visual);
                graph.node_mut(vis).position = visual.origin.position();
                graph.node_mut(vis).rotation = visual.origin.to_quat();
                graph.node_mut(vis).mesh = Some(Mesh::from_geometry(&visual.geometry));
                graph.attach(id, vis);
            }
            link_nodes.insert(link.name.clone(), id);
        }

        // Joints: parent link -> joint node -> child link
        let mut joints: BTreeMap<String, JointBinding> = BTreeMap::new();
        for joint in topology.joints.values() {
            let (parent, child) = match (
                link_nodes.get(&joint.parent),
                link_nodes.get(&joint.child),
            ) {
                (Some(&p), Some(&c)) => (p, c),
                _ => {
                    warn!(
                        target: "scene",
                        joint = %joint.name,
                        parent = %joint.parent,
                        child = %joint.child,
                        "Dropping joint with unresolved link"
                    );
                    continue;
                }
            };
            let node = graph.add_node(joint.name.clone(), NodeKind::Joint);
            graph.node_mut(node).position = joint.origin.position();
            graph.node_mut(node).rotation = joint.origin.to_quat();
            graph.attach(parent, node);
            graph.attach(node, child);

            // Axis comes straight off the wire; normalize here, with the +Z
            // fallback for a degenerate zero vector
            let axis = Vec3::from(joint.axis).normalize_or_zero();
            let axis = if axis == Vec3::ZERO { Vec3::Z } else { axis };

            joints.insert(
                joint.name.clone(),
                JointBinding {
                    node,
                    joint_type: joint.joint_type,
                    axis,
                    limits: joint.limits,
                    // placeholder until the snapshot pass below
                    base_position: Vec3::ZERO,
                    base_rotation: Quat::IDENTITY,
                    value: 0.0,
                },
            );
        }

        graph.attach(SceneGraph::ROOT, link_nodes[&root_link]);
        graph.update_world_all();

        // Snapshot base transforms at joint value 0
        for binding in joints.values_mut() {
            let node = graph.node(binding.node);
            binding.base_position = node.position;
            binding.base_rotation = node.rotation;
        }

        let mut scene = Self {
            graph,
            joints,
            root_link,
        };
        scene.set_all(initial);
        Ok(scene)
    }

    /// Set one joint to `value` (radians or metres).
    ///
    /// Returns whether the resolved value actually changed. Unknown joints and
    /// `fixed` joints are silently ignored; `revolute`/`prismatic` values are
    /// clamped to their limits; re-sending an identical value is a no-op and
    /// does not trigger a world-matrix recompute.
    pub fn set(&mut self, joint: &str, value: f64) -> bool {
        let Some(binding) = self.joints.get_mut(joint) else {
            debug!(target: "scene", joint = %joint, "Ignoring update for unknown joint");
            return false;
        };

        let resolved = match binding.joint_type {
            JointType::Fixed => return false,
            JointType::Floating | JointType::Planar => {
                // No scalar axis motion to apply
                debug!(target: "scene", joint = %joint, "Ignoring scalar value for multi-dof joint");
                return false;
            }
            JointType::Continuous => value,
            JointType::Revolute | JointType::Prismatic => match binding.limits {
                Some(limits) => limits.clamp(value),
                None => value,
            },
        };

        if resolved == binding.value {
            return false;
        }
        binding.value = resolved;

        let node = self.graph.node_mut(binding.node);
        match binding.joint_type {
            JointType::Revolute | JointType::Continuous => {
                node.rotation =
                    binding.base_rotation * Quat::from_axis_angle(binding.axis, resolved as f32);
            }
            JointType::Prismatic => {
                node.position = binding.base_position + binding.axis * resolved as f32;
            }
            _ => unreachable!(),
        }

        // Immediate recompute so readers never observe a stale subtree
        self.graph.update_world(binding.node);
        true
    }

    /// Apply a partial mapping of joint name -> value.
    ///
    /// Entries are applied independently; an unknown joint name is ignored
    /// without affecting the others. Returns true if any entry changed.
    pub fn set_all(&mut self, positions: &HashMap<String, f64>) -> bool {
        let mut changed = false;
        for (name, value) in positions {
            changed |= self.set(name, *value);
        }
        changed
    }

    /// Current value of one joint.
    pub fn get(&self, joint: &str) -> Option<f64> {
        self.joints.get(joint).map(|b| b.value)
    }

    /// The full current mapping of joint name -> value.
    pub fn positions(&self) -> HashMap<String, f64> {
        self.joints
            .iter()
            .map(|(name, b)| (name.clone(), b.value))
            .collect()
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.keys().cloned().collect()
    }

    pub fn root_link(&self) -> &str {
        &self.root_link
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }
}
