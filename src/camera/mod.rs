//! Camera system for 3D molecule viewing.
//!
//! Provides a perspective camera, damped orbit controls, and window input
//! handling.

/// Damped orbit controls (rotate, pan, zoom, reset).
pub mod controller;
/// Core camera struct and GPU uniform types.
pub mod core;
/// Window-event-based camera input handler.
#[cfg(feature = "viewer")]
pub mod input;
