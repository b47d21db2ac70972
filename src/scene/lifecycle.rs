//! Ownership of the live molecule group and its GPU resources.
//!
//! At most one molecule group is attached at any time. Replacing it always
//! detaches the old group and disposes every geometry and material it
//! referenced before the new group is built.

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use super::{Group, Light, MeshNode, NodeId, Scene, Transform};
use crate::camera::controller::OrbitControls;
use crate::camera::core::Camera;
use crate::geometry::{AtomSphere, BondPrimitive, Cylinder, RenderableGeometry};
use crate::gpu::resources::{
    GeometryHandle, MaterialDesc, MaterialHandle, RenderBackend,
};
use crate::options::{DisplayStyle, Options};
use crate::render_loop::FrameParts;
use crate::renderer::mesh::{MeshData, MIN_SPHERE_RADIUS};
use crate::structure::element;

/// Group-local bounding-box diagonal that the molecule is scaled to.
pub const TARGET_SIZE: f32 = 2.6;
/// Where the molecule is placed in front of the viewer while presenting.
pub const AR_ANCHOR: Vec3 = Vec3::new(0.0, 0.0, -0.6);
/// Bond cylinder color.
pub const BOND_COLOR: u32 = 0x00e0_e0e0;
/// Wireframe line color.
pub const LINE_COLOR: u32 = 0x00ff_ffff;

/// Placement computed for the current molecule group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Diagonal of the group-local bounding box.
    pub size: f32,
    /// Uniform scale applied to the group.
    pub scale: f32,
    /// Number of mesh nodes in the group.
    pub mesh_count: usize,
}

/// The attached molecule group and every handle it references.
#[derive(Debug)]
pub struct SceneResources {
    group: NodeId,
    geometries: Vec<GeometryHandle>,
    materials: Vec<MaterialHandle>,
    center: Vec3,
    framing: Framing,
}

impl SceneResources {
    /// Geometry handles owned by the group.
    #[must_use]
    pub fn geometries(&self) -> &[GeometryHandle] {
        &self.geometries
    }

    /// Material handles owned by the group.
    #[must_use]
    pub fn materials(&self) -> &[MaterialHandle] {
        &self.materials
    }

    /// Placement of the group.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }
}

/// Owns the scene, camera, controls, backend and the molecule group.
pub struct SceneLifecycleManager<B: RenderBackend> {
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    backend: B,
    resources: Option<SceneResources>,
}

impl<B: RenderBackend> SceneLifecycleManager<B> {
    /// Scene with the configured lights and an initial camera.
    #[must_use]
    pub fn new(backend: B, options: &Options, aspect: f32) -> Self {
        let mut scene = Scene::new();
        for light in Light::from_options(&options.lighting) {
            scene.add_light(light);
        }
        let camera = Camera::from_options(&options.camera, aspect);
        let mut controls = OrbitControls::new(&options.camera);
        controls.save_state(&camera);
        Self {
            scene,
            camera,
            controls,
            backend,
            resources: None,
        }
    }

    // -- Accessors --

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The orbit controls.
    #[must_use]
    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    /// Mutable orbit controls together with the camera they drive.
    pub fn controls_mut(&mut self) -> (&mut OrbitControls, &mut Camera) {
        (&mut self.controls, &mut self.camera)
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Resources of the attached molecule group.
    #[must_use]
    pub fn resources(&self) -> Option<&SceneResources> {
        self.resources.as_ref()
    }

    /// Whether a molecule group is attached.
    #[must_use]
    pub fn has_molecule(&self) -> bool {
        self.resources.is_some()
    }

    /// Borrow the pieces one render tick needs.
    pub fn frame_parts(&mut self) -> FrameParts<'_, B> {
        FrameParts {
            scene: &self.scene,
            camera: &mut self.camera,
            controls: &mut self.controls,
            backend: &mut self.backend,
        }
    }

    /// Update camera aspect and backend targets.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.backend.resize(width, height);
    }

    // -- Molecule group --

    /// Replace the molecule group with one built from `geometry`.
    pub fn apply_geometry(
        &mut self,
        geometry: &RenderableGeometry,
        presenting: bool,
    ) -> Framing {
        let _ = self.clear_molecule();

        let mut pass = BuildPass::new(&mut self.backend, geometry.style);
        for atom in &geometry.atoms {
            pass.add_atom(atom);
        }
        for bond in &geometry.bonds {
            match bond {
                BondPrimitive::Cylinder(cylinder) => pass.add_cylinder(cylinder),
                BondPrimitive::Line(line) => pass.add_line(line.start, line.end),
            }
        }
        let BuildPass {
            group,
            geometries,
            materials,
            ..
        } = pass;

        let (center, size) = bounds(geometry);
        let framing = Framing {
            size,
            scale: TARGET_SIZE / size.max(1.0),
            mesh_count: group.len(),
        };
        let id = self.scene.add_group(group);
        self.resources = Some(SceneResources {
            group: id,
            geometries,
            materials,
            center,
            framing,
        });
        log::info!(
            "molecule group attached: {} meshes, size {:.3}, scale {:.3} ({})",
            framing.mesh_count,
            framing.size,
            framing.scale,
            geometry.style.id()
        );

        self.reposition(presenting);
        framing
    }

    /// Detach the molecule group and dispose everything it referenced.
    /// Returns whether a group was attached.
    pub fn clear_molecule(&mut self) -> bool {
        let Some(resources) = self.resources.take() else {
            return false;
        };
        if self.scene.remove_group(resources.group).is_none() {
            log::warn!("molecule group {:?} was already detached", resources.group);
        }
        for handle in resources.geometries {
            self.backend.dispose_geometry(handle);
        }
        for handle in resources.materials {
            self.backend.dispose_material(handle);
        }
        log::debug!("molecule group disposed");
        true
    }

    /// Place the molecule group for the current presentation mode.
    ///
    /// While presenting, the group is centered on [`AR_ANCHOR`]. Otherwise it
    /// is centered on the origin and the camera and controls are reset to
    /// frame it.
    pub fn reposition(&mut self, presenting: bool) {
        let Some(resources) = &self.resources else {
            return;
        };
        let Framing { size, scale, .. } = resources.framing;
        let origin = if presenting { AR_ANCHOR } else { Vec3::ZERO };
        let transform = Transform {
            translation: origin - resources.center * scale,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(scale),
        };
        if let Some(group) = self.scene.group_mut(resources.group) {
            group.transform = transform;
        }

        if !presenting {
            let distance = (size * 0.9).max(3.0);
            self.controls.reset(&mut self.camera);
            self.controls.set_target(Vec3::ZERO);
            self.camera.eye = Vec3::new(distance, distance * 0.6, distance);
            self.camera.target = Vec3::ZERO;
            let _ = self.controls.update(&mut self.camera);
        }
    }
}

impl<B: RenderBackend> Drop for SceneLifecycleManager<B> {
    fn drop(&mut self) {
        let _ = self.clear_molecule();
    }
}

/// Cache key for per-element atom resources.
type AtomKey = (String, DisplayStyle);

/// One build of the molecule group. Caches live only for the pass.
struct BuildPass<'a, B: RenderBackend> {
    backend: &'a mut B,
    style: DisplayStyle,
    group: Group,
    geometries: Vec<GeometryHandle>,
    materials: Vec<MaterialHandle>,
    spheres: FxHashMap<AtomKey, GeometryHandle>,
    atom_materials: FxHashMap<AtomKey, MaterialHandle>,
    line_material: Option<MaterialHandle>,
    /// Base cylinder of the bond currently being emitted, for siblings.
    last_cylinder: Option<(usize, GeometryHandle, MaterialHandle)>,
}

impl<'a, B: RenderBackend> BuildPass<'a, B> {
    fn new(backend: &'a mut B, style: DisplayStyle) -> Self {
        Self {
            backend,
            style,
            group: Group::new(),
            geometries: Vec::new(),
            materials: Vec::new(),
            spheres: FxHashMap::default(),
            atom_materials: FxHashMap::default(),
            line_material: None,
            last_cylinder: None,
        }
    }

    fn geometry(&mut self, mesh: &MeshData, label: &str) -> GeometryHandle {
        let handle = self.backend.create_geometry(mesh, label);
        self.geometries.push(handle);
        handle
    }

    fn material(&mut self, desc: &MaterialDesc) -> MaterialHandle {
        let handle = self.backend.create_material(desc);
        self.materials.push(handle);
        handle
    }

    fn add_atom(&mut self, atom: &AtomSphere) {
        let key = (atom.element.clone(), self.style);
        let geometry = match self.spheres.get(&key) {
            Some(&g) => g,
            None => {
                let g = self.geometry(&MeshData::sphere(atom.radius), "atom sphere");
                let _ = self.spheres.insert(key.clone(), g);
                g
            }
        };
        let material = match self.atom_materials.get(&key) {
            Some(&m) => m,
            None => {
                let m = self.material(&atom_material(atom.color, self.style));
                let _ = self.atom_materials.insert(key, m);
                m
            }
        };
        self.group.children.push(MeshNode {
            geometry,
            material,
            transform: Transform::from_translation(atom.position),
        });
    }

    fn add_cylinder(&mut self, cylinder: &Cylinder) {
        let shared = self
            .last_cylinder
            .filter(|(bond, ..)| cylinder.sibling > 0 && *bond == cylinder.bond_index);
        let (geometry, material) = if let Some((_, g, m)) = shared {
            (g, m)
        } else {
            let g = self.geometry(
                &MeshData::cylinder(cylinder.radius, cylinder.length),
                "bond cylinder",
            );
            let m = self.material(&MaterialDesc::standard(
                element::hex_to_rgb(BOND_COLOR),
                0.2,
                0.5,
            ));
            self.last_cylinder = Some((cylinder.bond_index, g, m));
            (g, m)
        };
        self.group.children.push(MeshNode {
            geometry,
            material,
            transform: Transform::from_translation_rotation(
                cylinder.center,
                cylinder.orientation,
            ),
        });
    }

    fn add_line(&mut self, start: Vec3, end: Vec3) {
        let material = match self.line_material {
            Some(m) => m,
            None => {
                let m = self.material(&MaterialDesc::line(
                    element::hex_to_rgb(LINE_COLOR),
                    line_opacity(self.style),
                ));
                self.line_material = Some(m);
                m
            }
        };
        let geometry = self.geometry(&MeshData::line(start, end), "bond line");
        self.group.children.push(MeshNode {
            geometry,
            material,
            transform: Transform::IDENTITY,
        });
    }
}

/// Atom surface material for a display style.
#[must_use]
pub fn atom_material(color: [f32; 3], style: DisplayStyle) -> MaterialDesc {
    let roughness = match style {
        DisplayStyle::Spacefill => 0.4,
        DisplayStyle::Wireframe => 0.9,
        DisplayStyle::Stick => 0.6,
    };
    MaterialDesc::standard(color, 0.1, roughness)
        .with_wireframe(style == DisplayStyle::Wireframe)
}

/// Opacity of wireframe bond lines.
#[must_use]
pub fn line_opacity(style: DisplayStyle) -> f32 {
    match style {
        DisplayStyle::Wireframe => 0.9,
        DisplayStyle::Stick | DisplayStyle::Spacefill => 0.3,
    }
}

/// Center and diagonal length of the group-local bounding box. An empty
/// geometry has a zero box at the origin.
fn bounds(geometry: &RenderableGeometry) -> (Vec3, f32) {
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    let mut grow = |p: Vec3, r: f32| {
        lo = lo.min(p - Vec3::splat(r));
        hi = hi.max(p + Vec3::splat(r));
    };
    for atom in &geometry.atoms {
        grow(atom.position, atom.radius.max(MIN_SPHERE_RADIUS));
    }
    for bond in &geometry.bonds {
        match bond {
            BondPrimitive::Cylinder(c) => {
                grow(c.start, c.radius);
                grow(c.end, c.radius);
            }
            BondPrimitive::Line(l) => {
                grow(l.start, 0.0);
                grow(l.end, 0.0);
            }
        }
    }
    if lo.x > hi.x {
        return (Vec3::ZERO, 0.0);
    }
    ((lo + hi) * 0.5, (hi - lo).length())
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::geometry;
    use crate::gpu::resources::HeadlessBackend;
    use crate::structure::{Atom, Bond, Molecule};

    fn manager() -> SceneLifecycleManager<HeadlessBackend> {
        SceneLifecycleManager::new(HeadlessBackend::new(), &Options::default(), 1.0)
    }

    fn ethene() -> Molecule {
        Molecule::new(
            vec![
                Atom::new("C", DVec3::new(-0.67, 0.0, 0.0)),
                Atom::new("C", DVec3::new(0.67, 0.0, 0.0)),
                Atom::new("H", DVec3::new(-1.23, 0.92, 0.0)),
                Atom::new("H", DVec3::new(-1.23, -0.92, 0.0)),
                Atom::new("H", DVec3::new(1.23, 0.92, 0.0)),
                Atom::new("H", DVec3::new(1.23, -0.92, 0.0)),
            ],
            vec![
                Bond::new(0, 1, 2),
                Bond::new(0, 2, 1),
                Bond::new(0, 3, 1),
                Bond::new(1, 4, 1),
                Bond::new(1, 5, 1),
            ],
        )
    }

    #[test]
    fn stick_group_shares_atom_resources() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Stick);
        let framing = m.apply_geometry(&geo, false);

        // 6 atoms + 5 bonds + 1 sibling of the double bond.
        assert_eq!(framing.mesh_count, 12);
        let res = m.resources().unwrap();
        // 2 sphere geometries (C, H) + 5 cylinder geometries.
        assert_eq!(res.geometries().len(), 7);
        // 2 atom materials + 5 bond materials.
        assert_eq!(res.materials().len(), 7);
        assert_eq!(m.backend().ledger.live_geometry_count(), 7);
        assert_eq!(m.scene().group_count(), 1);
    }

    #[test]
    fn repeated_apply_keeps_one_group_and_disposes_old_handles() {
        let mut m = manager();
        let mut previous: Vec<GeometryHandle> = Vec::new();
        for style in [
            DisplayStyle::Stick,
            DisplayStyle::Spacefill,
            DisplayStyle::Wireframe,
            DisplayStyle::Stick,
        ] {
            let geo = geometry::build(&ethene(), style);
            let _ = m.apply_geometry(&geo, false);
            assert_eq!(m.scene().group_count(), 1);
            for handle in &previous {
                assert!(!m.backend().ledger.is_live_geometry(*handle));
            }
            let res = m.resources().unwrap();
            assert_eq!(
                m.backend().ledger.live_geometry_count(),
                res.geometries().len()
            );
            assert_eq!(
                m.backend().ledger.live_material_count(),
                res.materials().len()
            );
            previous = res.geometries().to_vec();
        }
        assert_eq!(m.backend().ledger.invalid_disposals, 0);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Stick);
        let _ = m.apply_geometry(&geo, false);
        assert!(m.clear_molecule());
        assert!(!m.clear_molecule());
        assert_eq!(m.scene().group_count(), 0);
        assert_eq!(m.backend().ledger.live_geometry_count(), 0);
        assert_eq!(m.backend().ledger.live_material_count(), 0);
        assert_eq!(m.backend().ledger.invalid_disposals, 0);
    }

    #[test]
    fn wireframe_shares_one_line_material() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Wireframe);
        let framing = m.apply_geometry(&geo, false);
        assert_eq!(framing.mesh_count, 11);
        let res = m.resources().unwrap();
        // 2 atom materials + 1 line material.
        assert_eq!(res.materials().len(), 3);
        // 2 spheres + 5 line geometries.
        assert_eq!(res.geometries().len(), 7);
    }

    #[test]
    fn group_is_centered_and_scaled() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Spacefill);
        let framing = m.apply_geometry(&geo, false);
        let (center, size) = bounds(&geo);
        assert!((framing.size - size).abs() < 1e-6);
        assert!((framing.scale - TARGET_SIZE / size.max(1.0)).abs() < 1e-6);

        let id = m.resources().unwrap().group;
        let group = m.scene().group(id).unwrap();
        assert!(group.transform.apply(center).length() < 1e-5);
    }

    #[test]
    fn camera_frames_molecule_when_not_presenting() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Stick);
        let framing = m.apply_geometry(&geo, false);
        let d = (framing.size * 0.9).max(3.0);
        let eye = m.camera().eye;
        assert!((eye - Vec3::new(d, 0.6 * d, d)).length() < 1e-3);
        assert_eq!(m.controls().target(), Vec3::ZERO);
    }

    #[test]
    fn presenting_anchors_group_in_front_of_viewer() {
        let mut m = manager();
        let geo = geometry::build(&ethene(), DisplayStyle::Stick);
        let _ = m.apply_geometry(&geo, false);
        let eye_before = m.camera().eye;

        m.reposition(true);
        let res = m.resources().unwrap();
        let group = m.scene().group(res.group).unwrap();
        assert!((group.transform.apply(res.center) - AR_ANCHOR).length() < 1e-5);
        assert_eq!(m.camera().eye, eye_before);

        m.reposition(false);
        let res = m.resources().unwrap();
        let group = m.scene().group(res.group).unwrap();
        assert!(group.transform.apply(res.center).length() < 1e-5);
    }

    #[test]
    fn material_parameters_follow_style() {
        let space = atom_material([1.0; 3], DisplayStyle::Spacefill);
        assert_eq!(space.roughness, 0.4);
        assert_eq!(space.metalness, 0.1);
        assert!(!space.wireframe);
        let wire = atom_material([1.0; 3], DisplayStyle::Wireframe);
        assert_eq!(wire.roughness, 0.9);
        assert!(wire.wireframe);
        assert_eq!(atom_material([1.0; 3], DisplayStyle::Stick).roughness, 0.6);
        assert_eq!(line_opacity(DisplayStyle::Wireframe), 0.9);
        assert_eq!(line_opacity(DisplayStyle::Stick), 0.3);
    }

    #[test]
    fn empty_bounds() {
        let geo = RenderableGeometry {
            style: DisplayStyle::Stick,
            atoms: Vec::new(),
            bonds: Vec::new(),
        };
        assert_eq!(bounds(&geo), (Vec3::ZERO, 0.0));
    }
}
