// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Connection-table ingestion and interactive 3D/AR molecule rendering on
//! wgpu.
//!
//! molstage parses MDL molfile / SDF V2000 text into a [`structure::Molecule`],
//! turns it into display primitives for one of three styles, and keeps a
//! single molecule group alive in a scene that a continuous render loop
//! draws. An immersive AR session can take over presentation; the render
//! loop then yields to the session's frame source.
//!
//! # Key entry points
//!
//! - [`stage::MoleculeStage`] - one viewer instance: loading, style,
//!   rendering, AR and status text
//! - [`structure::parse`] - connection table to molecule
//! - [`geometry::build`] - molecule plus style to primitives
//! - [`scene::SceneLifecycleManager`] - scene, camera, lights and the
//!   molecule group with its GPU resources
//! - [`options::Options`] - runtime configuration (display, camera,
//!   lighting)
//!
//! # Architecture
//!
//! GPU work goes through the [`gpu::resources::RenderBackend`] trait. The
//! window renderer is [`renderer::mesh_renderer::WgpuBackend`]; tests use
//! [`gpu::resources::HeadlessBackend`], which records allocations in a
//! ledger instead of touching a device.

pub mod ar;
pub mod camera;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod gpu;
pub mod options;
pub mod render_loop;
pub mod renderer;
pub mod scene;
pub mod stage;
pub mod structure;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use error::StageError;
pub use options::{DisplayStyle, Options};
pub use stage::MoleculeStage;
