use glam::{Mat4, Quat, Vec3};

use crate::gpu::resources::{GeometryHandle, MaterialHandle};

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub translation: Vec3,
    /// Rotation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No translation, rotation or scale.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Pure translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Translation plus rotation.
    #[must_use]
    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Local-to-parent matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Transform a local point into parent space.
    #[must_use]
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }
}

/// A drawable: one geometry with one material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshNode {
    /// Geometry to draw.
    pub geometry: GeometryHandle,
    /// Material to draw with.
    pub material: MaterialHandle,
    /// Placement inside the owning group.
    pub transform: Transform,
}

/// A transformable collection of mesh nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    /// Group placement in the world.
    pub transform: Transform,
    /// Child meshes.
    pub children: Vec<MeshNode>,
}

impl Group {
    /// Empty group at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of child meshes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
