//! GPU resource seam between scene management and the renderer.
//!
//! The scene lifecycle manager never touches wgpu directly: it allocates
//! geometry and materials through [`ResourceAllocator`] and draws through
//! [`RenderBackend`]. [`HeadlessBackend`] implements both with plain
//! bookkeeping, which lets lifecycle and render-loop behaviour be checked
//! without a device.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::camera::core::Camera;
use crate::renderer::mesh::{MeshData, Topology};
use crate::scene::Scene;

/// Opaque handle to uploaded geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u64);

/// Opaque handle to a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(pub u64);

/// Shading model of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Lit surface with metalness/roughness.
    Standard,
    /// Unlit, optionally translucent line color.
    Line,
}

/// Material parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    /// Shading model.
    pub kind: MaterialKind,
    /// Linear RGB base color.
    pub color: [f32; 3],
    /// Metalness in `[0, 1]`.
    pub metalness: f32,
    /// Roughness in `[0, 1]`.
    pub roughness: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Draw triangle edges instead of filled faces.
    pub wireframe: bool,
}

impl MaterialDesc {
    /// Opaque lit material.
    #[must_use]
    pub fn standard(color: [f32; 3], metalness: f32, roughness: f32) -> Self {
        Self {
            kind: MaterialKind::Standard,
            color,
            metalness,
            roughness,
            opacity: 1.0,
            wireframe: false,
        }
    }

    /// Unlit line material.
    #[must_use]
    pub fn line(color: [f32; 3], opacity: f32) -> Self {
        Self {
            kind: MaterialKind::Line,
            color,
            metalness: 0.0,
            roughness: 1.0,
            opacity,
            wireframe: false,
        }
    }

    /// Same material with the wireframe flag set.
    #[must_use]
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Whether blending is required.
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Allocation and release of GPU-side geometry and materials.
///
/// Every handle returned by a `create_*` call must be passed to the
/// matching `dispose_*` call exactly once.
pub trait ResourceAllocator {
    /// Upload `mesh` and return its handle.
    fn create_geometry(&mut self, mesh: &MeshData, label: &str) -> GeometryHandle;
    /// Register a material and return its handle.
    fn create_material(&mut self, desc: &MaterialDesc) -> MaterialHandle;
    /// Release geometry.
    fn dispose_geometry(&mut self, handle: GeometryHandle);
    /// Release a material.
    fn dispose_material(&mut self, handle: MaterialHandle);
}

/// A renderer that can draw a [`Scene`] from a [`Camera`].
pub trait RenderBackend: ResourceAllocator {
    /// Draw one frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the frame could not be produced.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError>;

    /// Resize render targets. Zero dimensions are ignored.
    fn resize(&mut self, width: u32, height: u32);
}

/// A frame that could not be rendered.
#[derive(Debug)]
pub enum RenderError {
    /// Swapchain texture acquisition failed.
    Surface(wgpu::SurfaceError),
    /// A scene node references a handle that was never created or was
    /// already disposed.
    UnknownHandle(String),
    /// Failure reported by a non-GPU backend.
    Backend(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::UnknownHandle(what) => write!(f, "unknown handle: {what}"),
            Self::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            Self::UnknownHandle(_) | Self::Backend(_) => None,
        }
    }
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Surface(e)
    }
}

// ── Headless backend ──

/// Allocation bookkeeping kept by [`HeadlessBackend`].
#[derive(Debug, Default)]
pub struct ResourceLedger {
    next_id: u64,
    live_geometries: FxHashSet<GeometryHandle>,
    live_materials: FxHashSet<MaterialHandle>,
    /// Geometries created so far.
    pub geometries_created: usize,
    /// Materials created so far.
    pub materials_created: usize,
    /// Geometries released so far.
    pub geometries_disposed: usize,
    /// Materials released so far.
    pub materials_disposed: usize,
    /// Dispose calls for handles that were not live.
    pub invalid_disposals: usize,
    /// Vertices uploaded across all geometries.
    pub vertices_uploaded: usize,
}

impl ResourceLedger {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Whether `handle` is currently allocated.
    #[must_use]
    pub fn is_live_geometry(&self, handle: GeometryHandle) -> bool {
        self.live_geometries.contains(&handle)
    }

    /// Whether `handle` is currently allocated.
    #[must_use]
    pub fn is_live_material(&self, handle: MaterialHandle) -> bool {
        self.live_materials.contains(&handle)
    }

    /// Number of allocated geometries.
    #[must_use]
    pub fn live_geometry_count(&self) -> usize {
        self.live_geometries.len()
    }

    /// Number of allocated materials.
    #[must_use]
    pub fn live_material_count(&self) -> usize {
        self.live_materials.len()
    }
}

/// Device-free backend that records allocations and counts frames.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    /// Allocation bookkeeping.
    pub ledger: ResourceLedger,
    /// Frames rendered successfully.
    pub frames_rendered: u64,
    /// Meshes drawn by the most recent frame.
    pub last_draw_count: usize,
    /// When set, the next `render` call fails with this message.
    pub fail_next_render: Option<String>,
    /// Current target size.
    pub size: (u32, u32),
}

impl HeadlessBackend {
    /// Empty backend with a 1x1 target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: (1, 1),
            ..Self::default()
        }
    }
}

impl ResourceAllocator for HeadlessBackend {
    fn create_geometry(&mut self, mesh: &MeshData, _label: &str) -> GeometryHandle {
        let handle = GeometryHandle(self.ledger.next());
        let _ = self.ledger.live_geometries.insert(handle);
        self.ledger.geometries_created += 1;
        self.ledger.vertices_uploaded += mesh.vertices.len();
        handle
    }

    fn create_material(&mut self, _desc: &MaterialDesc) -> MaterialHandle {
        let handle = MaterialHandle(self.ledger.next());
        let _ = self.ledger.live_materials.insert(handle);
        self.ledger.materials_created += 1;
        handle
    }

    fn dispose_geometry(&mut self, handle: GeometryHandle) {
        if self.ledger.live_geometries.remove(&handle) {
            self.ledger.geometries_disposed += 1;
        } else {
            log::warn!("dispose of unknown geometry {handle:?}");
            self.ledger.invalid_disposals += 1;
        }
    }

    fn dispose_material(&mut self, handle: MaterialHandle) {
        if self.ledger.live_materials.remove(&handle) {
            self.ledger.materials_disposed += 1;
        } else {
            log::warn!("dispose of unknown material {handle:?}");
            self.ledger.invalid_disposals += 1;
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn render(&mut self, scene: &Scene, _camera: &Camera) -> Result<(), RenderError> {
        if let Some(msg) = self.fail_next_render.take() {
            return Err(RenderError::Backend(msg));
        }
        let mut count = 0;
        for (_, node) in scene.draw_list() {
            if !self.ledger.is_live_geometry(node.geometry) {
                return Err(RenderError::UnknownHandle(format!(
                    "{:?}",
                    node.geometry
                )));
            }
            if !self.ledger.is_live_material(node.material) {
                return Err(RenderError::UnknownHandle(format!(
                    "{:?}",
                    node.material
                )));
            }
            count += 1;
        }
        self.last_draw_count = count;
        self.frames_rendered += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
        }
    }
}

/// Line-list indices covering every edge of a triangle list, used to draw
/// wireframe materials.
#[must_use]
pub fn wireframe_indices(mesh: &MeshData) -> Vec<u32> {
    match mesh.topology {
        Topology::Lines => mesh.indices.clone(),
        Topology::Triangles => mesh
            .indices
            .chunks_exact(3)
            .flat_map(|t| [t[0], t[1], t[1], t[2], t[2], t[0]])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_tracks_live_handles() {
        let mut backend = HeadlessBackend::new();
        let g = backend.create_geometry(&MeshData::sphere(0.4), "atom");
        let m = backend.create_material(&MaterialDesc::standard([1.0; 3], 0.1, 0.6));
        assert!(backend.ledger.is_live_geometry(g));
        assert!(backend.ledger.is_live_material(m));

        backend.dispose_geometry(g);
        backend.dispose_material(m);
        assert_eq!(backend.ledger.live_geometry_count(), 0);
        assert_eq!(backend.ledger.live_material_count(), 0);
        assert_eq!(backend.ledger.invalid_disposals, 0);

        backend.dispose_geometry(g);
        assert_eq!(backend.ledger.invalid_disposals, 1);
    }

    #[test]
    fn handles_are_unique() {
        let mut backend = HeadlessBackend::new();
        let a = backend.create_geometry(&MeshData::line(glam::Vec3::ZERO, glam::Vec3::X), "a");
        let b = backend.create_geometry(&MeshData::line(glam::Vec3::ZERO, glam::Vec3::Y), "b");
        assert_ne!(a, b);
    }

    #[test]
    fn failed_render_is_one_shot() {
        let mut backend = HeadlessBackend::new();
        backend.fail_next_render = Some("lost".to_owned());
        let scene = Scene::new();
        let camera = Camera::default();
        assert!(backend.render(&scene, &camera).is_err());
        assert!(backend.render(&scene, &camera).is_ok());
        assert_eq!(backend.frames_rendered, 1);
    }

    #[test]
    fn wireframe_edges_from_triangles() {
        let mesh = MeshData {
            vertices: Vec::new(),
            indices: vec![0, 1, 2],
            topology: Topology::Triangles,
        };
        assert_eq!(wireframe_indices(&mesh), vec![0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn translucency() {
        assert!(MaterialDesc::line([1.0; 3], 0.3).is_translucent());
        assert!(!MaterialDesc::standard([1.0; 3], 0.2, 0.5).is_translucent());
    }
}
