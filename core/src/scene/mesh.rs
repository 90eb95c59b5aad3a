// Primitive mesh generation for link visuals.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};

use crate::topology::Geometry;

/// Edge length of the placeholder box substituted for unresolved geometry.
pub const PLACEHOLDER_SIZE: f32 = 0.05;

const SEGMENTS: u32 = 24;
const RINGS: u32 = 12;

/// Triangle mesh: flat position buffer plus an index buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Generate a mesh for a visual geometry record.
    ///
    /// Mesh references and unknown geometry tags fall back to a small
    /// placeholder box rather than failing.
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Box { size } => cuboid(size[0], size[1], size[2]),
            Geometry::Cylinder { radius, length } => cylinder(*radius, *length),
            Geometry::Sphere { radius } => sphere(*radius),
            Geometry::Mesh { .. } | Geometry::Other => placeholder(),
        }
    }

    /// Axis-aligned extent of the mesh (max - min per component).
    pub fn extent(&self) -> Vec3 {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            min = min.min(*p);
            max = max.max(*p);
        }
        if self.positions.is_empty() {
            Vec3::ZERO
        } else {
            max - min
        }
    }
}

pub fn placeholder() -> Mesh {
    cuboid(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)
}

pub fn cuboid(sx: f32, sy: f32, sz: f32) -> Mesh {
    let (hx, hy, hz) = (sx / 2.0, sy / 2.0, sz / 2.0);
    let positions = vec![
        Vec3::new(-hx, -hy, -hz),
        Vec3::new(hx, -hy, -hz),
        Vec3::new(hx, hy, -hz),
        Vec3::new(-hx, hy, -hz),
        Vec3::new(-hx, -hy, hz),
        Vec3::new(hx, -hy, hz),
        Vec3::new(hx, hy, hz),
        Vec3::new(-hx, hy, hz),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // back
        4, 5, 6, 4, 6, 7, // front
        0, 1, 5, 0, 5, 4, // bottom
        3, 7, 6, 3, 6, 2, // top
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
    ];
    Mesh { positions, indices }
}

/// Cylinder of `length` along the local Z axis.
///
/// The generator lays the solid out along Y (the common library default);
/// the domain convention extrudes along the joint's local Z, so every vertex
/// gets a fixed 90-degree pre-rotation about X.
pub fn cylinder(radius: f32, length: f32) -> Mesh {
    let correction = Quat::from_rotation_x(FRAC_PI_2);
    let half = length / 2.0;

    let mut positions = Vec::new();
    let mut indices = Vec::new();

    // Two rings of SEGMENTS vertices plus two cap centres, built Y-up
    for &y in &[-half, half] {
        for i in 0..SEGMENTS {
            let theta = 2.0 * PI * i as f32 / SEGMENTS as f32;
            positions.push(Vec3::new(radius * theta.cos(), y, radius * theta.sin()));
        }
    }
    let bottom_center = positions.len() as u32;
    positions.push(Vec3::new(0.0, -half, 0.0));
    let top_center = positions.len() as u32;
    positions.push(Vec3::new(0.0, half, 0.0));

    for i in 0..SEGMENTS {
        let next = (i + 1) % SEGMENTS;
        let (b0, b1) = (i, next);
        let (t0, t1) = (SEGMENTS + i, SEGMENTS + next);
        // side quad
        indices.extend_from_slice(&[b0, t0, b1, b1, t0, t1]);
        // caps
        indices.extend_from_slice(&[bottom_center, b1, b0]);
        indices.extend_from_slice(&[top_center, t0, t1]);
    }

    for p in &mut positions {
        *p = correction * *p;
    }

    Mesh { positions, indices }
}

pub fn sphere(radius: f32) -> Mesh {
    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=RINGS {
        let phi = PI * ring as f32 / RINGS as f32;
        for seg in 0..=SEGMENTS {
            let theta = 2.0 * PI * seg as f32 / SEGMENTS as f32;
            positions.push(Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            ));
        }
    }

    let stride = SEGMENTS + 1;
    for ring in 0..RINGS {
        for seg in 0..SEGMENTS {
            let a = ring * stride + seg;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    Mesh { positions, indices }
}
