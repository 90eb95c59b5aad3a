//! Scene synchronisation layer.
//!
//! Builds an in-memory scene tree from a [`crate::topology::Topology`] and
//! keeps it consistent with a stream of joint-position updates. The graph is
//! arena-based (indices, no shared ownership) and is owned exclusively by
//! whoever drives the update loop.

mod graph;
mod mesh;
mod robot;

pub use graph::{NodeId, NodeKind, SceneGraph, SceneNode};
pub use mesh::{Mesh, PLACEHOLDER_SIZE};
pub use robot::RobotScene;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    /// No link qualifies as the root (every link is some joint's child).
    #[error("topology has no root link")]
    NoRootLink,

    /// The topology carries no links at all.
    #[error("topology has no links")]
    EmptyTopology,
}
