//! CPU-side mesh tessellation for atom spheres, bond cylinders and
//! wireframe lines.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

/// Smallest sphere radius that is tessellated.
pub const MIN_SPHERE_RADIUS: f32 = 0.05;
/// Longitude segments per sphere.
pub const SPHERE_WIDTH_SEGMENTS: u32 = 32;
/// Latitude segments per sphere.
pub const SPHERE_HEIGHT_SEGMENTS: u32 = 32;
/// Radial segments per bond cylinder.
pub const CYLINDER_RADIAL_SEGMENTS: u32 = 24;

// ── Vertex format ──

/// 24-byte vertex shared by the triangle and line pipelines.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal (zero for lines).
    pub normal: [f32; 3],
}

impl MeshVertex {
    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// Vertex buffer layout for [`MeshVertex`].
#[must_use]
pub fn mesh_vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
        ],
    }
}

// ── Mesh data ──

/// Primitive topology of a [`MeshData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Indexed triangle list.
    Triangles,
    /// Indexed line list.
    Lines,
}

/// Indexed geometry ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Vertex data.
    pub vertices: Vec<MeshVertex>,
    /// Indices into `vertices`.
    pub indices: Vec<u32>,
    /// How `indices` are assembled.
    pub topology: Topology,
}

impl MeshData {
    /// UV sphere centered on the origin. `radius` is floored at
    /// [`MIN_SPHERE_RADIUS`].
    #[must_use]
    pub fn sphere(radius: f32) -> Self {
        let radius = radius.max(MIN_SPHERE_RADIUS);
        let (w, h) = (SPHERE_WIDTH_SEGMENTS, SPHERE_HEIGHT_SEGMENTS);
        let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);

        for iy in 0..=h {
            let v = iy as f32 / h as f32;
            let theta = v * PI;
            for ix in 0..=w {
                let u = ix as f32 / w as f32;
                let phi = u * TAU;
                let normal = Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                );
                vertices.push(MeshVertex::new(normal * radius, normal));
            }
        }

        let mut indices = Vec::with_capacity((w * h * 6) as usize);
        let row = w + 1;
        for iy in 0..h {
            for ix in 0..w {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // Pole rows collapse to a point; skip their degenerate halves.
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != h - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    /// Capped cylinder along +Y, centered on the origin.
    #[must_use]
    pub fn cylinder(radius: f32, height: f32) -> Self {
        let segments = CYLINDER_RADIAL_SEGMENTS;
        let half = height * 0.5;
        let ring = |i: u32| {
            let angle = i as f32 / segments as f32 * TAU;
            Vec3::new(angle.sin(), 0.0, angle.cos())
        };

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        // Side.
        for i in 0..=segments {
            let n = ring(i);
            vertices.push(MeshVertex::new(n * radius + Vec3::Y * half, n));
            vertices.push(MeshVertex::new(n * radius - Vec3::Y * half, n));
        }
        for i in 0..segments {
            let top = i * 2;
            let bottom = top + 1;
            let next_top = top + 2;
            let next_bottom = top + 3;
            indices.extend_from_slice(&[top, bottom, next_top]);
            indices.extend_from_slice(&[bottom, next_bottom, next_top]);
        }

        // Caps.
        for (y, normal) in [(half, Vec3::Y), (-half, Vec3::NEG_Y)] {
            let center = vertices.len() as u32;
            vertices.push(MeshVertex::new(Vec3::Y * y, normal));
            for i in 0..=segments {
                vertices.push(MeshVertex::new(
                    ring(i) * radius + Vec3::Y * y,
                    normal,
                ));
            }
            for i in 0..segments {
                let a = center + 1 + i;
                let b = a + 1;
                if y > 0.0 {
                    indices.extend_from_slice(&[center, a, b]);
                } else {
                    indices.extend_from_slice(&[center, b, a]);
                }
            }
        }

        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    /// Single line segment in the owning node's local space.
    #[must_use]
    pub fn line(start: Vec3, end: Vec3) -> Self {
        Self {
            vertices: vec![
                MeshVertex::new(start, Vec3::ZERO),
                MeshVertex::new(end, Vec3::ZERO),
            ],
            indices: vec![0, 1],
            topology: Topology::Lines,
        }
    }

    /// Number of indices.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Axis-aligned bounds of the vertex positions, `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = MeshData::sphere(0.4);
        assert_eq!(mesh.topology, Topology::Triangles);
        assert_eq!(mesh.index_count() % 3, 0);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.position).length() - 0.4).abs() < 1e-5);
        }
        let max = mesh.indices.iter().copied().max().unwrap();
        assert!((max as usize) < mesh.vertices.len());
    }

    #[test]
    fn tiny_spheres_are_floored() {
        let mesh = MeshData::sphere(0.001);
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((hi.y - MIN_SPHERE_RADIUS).abs() < 1e-6);
        assert!((lo.y + MIN_SPHERE_RADIUS).abs() < 1e-6);
    }

    #[test]
    fn cylinder_extends_along_y() {
        let mesh = MeshData::cylinder(0.056, 0.55);
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((hi.y - 0.275).abs() < 1e-6);
        assert!((lo.y + 0.275).abs() < 1e-6);
        assert!((hi.x - 0.056).abs() < 1e-5);
        assert_eq!(mesh.index_count() % 3, 0);
    }

    #[test]
    fn zero_length_cylinder_is_still_valid() {
        let mesh = MeshData::cylinder(0.056, 0.0);
        assert!(!mesh.indices.is_empty());
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo.y, 0.0);
        assert_eq!(hi.y, 0.0);
    }

    #[test]
    fn line_has_two_points() {
        let mesh = MeshData::line(Vec3::ZERO, Vec3::X);
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.indices, vec![0, 1]);
        assert_eq!(mesh.bounds(), Some((Vec3::ZERO, Vec3::X)));
    }

    #[test]
    fn vertex_is_24_bytes() {
        assert_eq!(size_of::<MeshVertex>(), 24);
    }
}
