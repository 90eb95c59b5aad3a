//! Static robot description: links, joints, visual geometry.
//!
//! A `Topology` is loaded once per robot session and is immutable thereafter.
//! It is the payload of the `robot.query.topology` reply and the input to
//! [`crate::scene::RobotScene::build`].

use std::collections::BTreeMap;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation (roll, pitch, yaw in radians).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub xyz: [f32; 3],
    pub rpy: [f32; 3],
}

impl Pose {
    pub fn new(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn from_position(xyz: [f32; 3]) -> Self {
        Self { xyz, rpy: [0.0; 3] }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.to_quat(), self.position())
    }

    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rpy[0], self.rpy[1], self.rpy[2])
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.xyz)
    }
}

/// Visual primitive carried by a link.
///
/// `Other` catches geometry tags this version does not understand; the scene
/// builder substitutes a placeholder box for it instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Box { size: [f32; 3] },
    Cylinder { radius: f32, length: f32 },
    Sphere { radius: f32 },
    Mesh { path: String },
    #[serde(other)]
    Other,
}

/// Material (colour only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: [f32; 4],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            color: [0.5, 0.5, 0.5, 1.0],
        }
    }
}

/// Single visual element for a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    #[serde(default)]
    pub origin: Pose,
    pub geometry: Geometry,
    #[serde(default)]
    pub material: Option<Material>,
}

/// A rigid body segment with an optional visual representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    #[serde(default)]
    pub visual: Option<Visual>,
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visual: None,
        }
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = Some(visual);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

/// Lower/upper bounds: radians for rotational joints, metres for prismatic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl JointLimits {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

fn default_axis() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

/// A named connection between two links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    /// Parent link name
    pub parent: String,
    /// Child link name
    pub child: String,
    /// Transform from parent link to joint origin
    #[serde(default)]
    pub origin: Pose,
    /// Rotation/translation axis in the joint's local frame (unit vector)
    #[serde(default = "default_axis")]
    pub axis: [f32; 3],
    #[serde(default)]
    pub limits: Option<JointLimits>,
}

impl Joint {
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            origin: Pose::default(),
            axis: default_axis(),
            limits: None,
        }
    }

    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_axis(mut self, axis: [f32; 3]) -> Self {
        let v = Vec3::from(axis).normalize_or_zero();
        self.axis = if v == Vec3::ZERO {
            default_axis()
        } else {
            v.to_array()
        };
        self
    }

    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = Some(JointLimits::new(lower, upper));
        self
    }
}

/// Static description of a robot: named links and named joints.
///
/// `BTreeMap` keeps iteration order deterministic, which pins down root
/// discovery when the topology has more than one candidate root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub links: BTreeMap<String, Link>,
    pub joints: BTreeMap<String, Joint>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_link(&mut self, link: Link) -> &mut Self {
        self.links.insert(link.name.clone(), link);
        self
    }

    pub fn add_joint(&mut self, joint: Joint) -> &mut Self {
        self.joints.insert(joint.name.clone(), joint);
        self
    }

    /// The root link: the first link (in name order) that is never a joint's
    /// child. Returns `None` when every link is some joint's child or the
    /// topology has no links.
    pub fn root_link(&self) -> Option<&Link> {
        self.links
            .values()
            .find(|link| !self.joints.values().any(|j| j.child == link.name))
    }

    /// Joints whose parent and child links both exist.
    pub fn resolvable_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints
            .values()
            .filter(|j| self.links.contains_key(&j.parent) && self.links.contains_key(&j.child))
    }
}
