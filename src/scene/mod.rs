//! Retained scene: lights plus transformable groups of mesh nodes.
//!
//! The scene only references GPU resources by handle. Allocation and
//! disposal go through the [`lifecycle::SceneLifecycleManager`], which is
//! the only code that attaches or detaches the molecule group.

pub mod lifecycle;
mod node;

use glam::{Mat4, Vec3};
pub use lifecycle::{Framing, SceneLifecycleManager, SceneResources};
pub use node::{Group, MeshNode, Transform};

use crate::options::LightingOptions;

/// Identifier of a group attached to a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Scene light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Uniform light from every direction.
    Ambient {
        /// Linear RGB color.
        color: [f32; 3],
        /// Intensity multiplier.
        intensity: f32,
    },
    /// Parallel light shining from `position` toward the origin.
    Directional {
        /// Linear RGB color.
        color: [f32; 3],
        /// Intensity multiplier.
        intensity: f32,
        /// Light position; the direction is `-position.normalize()`.
        position: Vec3,
    },
}

impl Light {
    /// Ambient and directional lights described by `options`.
    #[must_use]
    pub fn from_options(options: &LightingOptions) -> [Self; 2] {
        [
            Self::Ambient {
                color: options.color,
                intensity: options.ambient,
            },
            Self::Directional {
                color: options.color,
                intensity: options.directional,
                position: Vec3::from(options.directional_position),
            },
        ]
    }
}

/// Lights and groups to be drawn.
#[derive(Debug, Default)]
pub struct Scene {
    lights: Vec<Light>,
    groups: Vec<(NodeId, Group)>,
    next_id: u64,
}

impl Scene {
    /// Empty scene with no lights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Lights --

    /// Add a light.
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// All lights in insertion order.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Sum of ambient light as RGB.
    #[must_use]
    pub fn ambient(&self) -> Vec3 {
        self.lights
            .iter()
            .filter_map(|l| match l {
                Light::Ambient { color, intensity } => Some(Vec3::from(*color) * *intensity),
                Light::Directional { .. } => None,
            })
            .sum()
    }

    /// First directional light as (direction toward the light, RGB).
    #[must_use]
    pub fn key_light(&self) -> Option<(Vec3, Vec3)> {
        self.lights.iter().find_map(|l| match l {
            Light::Directional {
                color,
                intensity,
                position,
            } => Some((position.normalize_or_zero(), Vec3::from(*color) * *intensity)),
            Light::Ambient { .. } => None,
        })
    }

    // -- Groups --

    /// Attach a group and return its id.
    pub fn add_group(&mut self, group: Group) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.groups.push((id, group));
        id
    }

    /// Detach a group, returning it if it was attached.
    pub fn remove_group(&mut self, id: NodeId) -> Option<Group> {
        let index = self.groups.iter().position(|(gid, _)| *gid == id)?;
        Some(self.groups.remove(index).1)
    }

    /// Borrow an attached group.
    #[must_use]
    pub fn group(&self, id: NodeId) -> Option<&Group> {
        self.groups.iter().find(|(gid, _)| *gid == id).map(|(_, g)| g)
    }

    /// Mutably borrow an attached group.
    pub fn group_mut(&mut self, id: NodeId) -> Option<&mut Group> {
        self.groups
            .iter_mut()
            .find(|(gid, _)| *gid == id)
            .map(|(_, g)| g)
    }

    /// Number of attached groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Every mesh node with its world matrix, in draw order.
    pub fn draw_list(&self) -> impl Iterator<Item = (Mat4, &MeshNode)> + '_ {
        self.groups.iter().flat_map(|(_, group)| {
            let parent = group.transform.matrix();
            group
                .children
                .iter()
                .map(move |node| (parent * node.transform.matrix(), node))
        })
    }
}
