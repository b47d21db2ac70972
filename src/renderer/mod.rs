//! Mesh tessellation and the wgpu renderer.
//!
//! [`mesh`] produces the vertex data for atoms, bonds and lines;
//! [`mesh_renderer`] uploads it and draws the scene graph every frame.

pub mod mesh;
pub mod mesh_renderer;
