//! GPU resource management.
//!
//! Provides wgpu device/surface initialization, growable buffers, the depth
//! target, and the allocation seam used by the scene lifecycle.

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// Geometry/material handles, allocator and backend traits, headless backend.
pub mod resources;
/// Depth attachment.
pub mod texture;
