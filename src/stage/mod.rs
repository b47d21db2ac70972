//! The molecule stage: one viewer instance wiring loading, geometry,
//! scene lifecycle, render loop and AR session together.
//!
//! All methods run on the UI thread. Fetches happen elsewhere and report
//! back through [`MoleculeStage::complete_load`] with the ticket they were
//! issued; results of superseded requests are dropped there.

mod load;
pub mod status;

pub use load::{FetchTicket, LoadCoordinator, LoadOutcome, LoadState};
pub use status::StatusInputs;

use crate::ar::{
    ArCapabilityError, ArSessionController, ArSessionError, SessionTransition,
    XrPlatform,
};
use crate::fetch::{self, FetchError};
use crate::geometry;
use crate::gpu::resources::RenderBackend;
use crate::options::{DisplayStyle, Options};
use crate::render_loop::{FrameSource, LoopHandle, RenderLoop, TickOutcome};
use crate::scene::{Framing, SceneLifecycleManager};
use crate::structure::library::Preset;
use crate::structure::{self, Molecule, ParseError};

/// Load error shown when a downloaded file yields no molecule.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse 3D structure from PubChem.";

/// One interactive molecule viewer.
pub struct MoleculeStage<B: RenderBackend> {
    lifecycle: SceneLifecycleManager<B>,
    render_loop: RenderLoop,
    loop_handle: Option<LoopHandle>,
    ar: ArSessionController,
    loads: LoadCoordinator,
    load_state: LoadState,
    style: DisplayStyle,
    molecule: Option<Molecule>,
    selection: Option<Preset>,
}

impl<B: RenderBackend> MoleculeStage<B> {
    /// Build the scene on `backend` and start the render loop.
    #[must_use]
    pub fn new(backend: B, options: &Options, aspect: f32) -> Self {
        let mut render_loop = RenderLoop::with_target_fps(options.display.target_fps);
        let loop_handle = Some(render_loop.start());
        Self {
            lifecycle: SceneLifecycleManager::new(backend, options, aspect),
            render_loop,
            loop_handle,
            ar: ArSessionController::new(),
            loads: LoadCoordinator::new(),
            load_state: LoadState::Idle,
            style: options.display.style,
            molecule: None,
            selection: None,
        }
    }

    // -- Accessors --

    /// Scene, camera, controls and backend.
    #[must_use]
    pub fn lifecycle(&self) -> &SceneLifecycleManager<B> {
        &self.lifecycle
    }

    /// Mutable scene lifecycle (for input handling and resizing).
    pub fn lifecycle_mut(&mut self) -> &mut SceneLifecycleManager<B> {
        &mut self.lifecycle
    }

    /// AR session controller.
    #[must_use]
    pub fn ar(&self) -> &ArSessionController {
        &self.ar
    }

    /// Render loop state.
    #[must_use]
    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// Current display style.
    #[must_use]
    pub fn style(&self) -> DisplayStyle {
        self.style
    }

    /// Molecule on stage.
    #[must_use]
    pub fn molecule(&self) -> Option<&Molecule> {
        self.molecule.as_ref()
    }

    /// Progress of the current load.
    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Preset selected with [`Self::select`].
    #[must_use]
    pub fn selection(&self) -> Option<&Preset> {
        self.selection.as_ref()
    }

    /// Whether the viewer is running (render loop started, not shut down).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.loop_handle.is_some() && self.render_loop.is_running()
    }

    // -- Loading --

    /// Select a preset and start loading it.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_load`].
    pub fn select(&mut self, preset: Preset) -> Result<FetchTicket, FetchError> {
        let cid = preset.cid.clone();
        self.selection = Some(preset);
        self.begin_load(&cid)
    }

    /// Start loading `cid`: supersede any load in flight and clear the
    /// current molecule. The caller fetches with the returned ticket and
    /// hands the result to [`Self::complete_load`].
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidCid`] for a blank or non-numeric CID; the load
    /// state then holds the corresponding message and the current molecule
    /// is kept.
    pub fn begin_load(&mut self, cid: &str) -> Result<FetchTicket, FetchError> {
        let cid = match fetch::validate_cid(cid) {
            Ok(cid) => cid,
            Err(e) => {
                self.load_state = LoadState::Failed(e.user_message());
                return Err(e);
            }
        };
        let ticket = self.loads.begin(cid);
        self.molecule = None;
        let _ = self.lifecycle.clear_molecule();
        self.load_state = LoadState::Loading;
        Ok(ticket)
    }

    /// Apply the result of the fetch issued with `ticket`. Returns
    /// [`LoadOutcome::Stale`] (and changes nothing) for superseded tickets.
    pub fn complete_load(
        &mut self,
        ticket: &FetchTicket,
        result: Result<String, FetchError>,
    ) -> LoadOutcome {
        let outcome = self.loads.complete(ticket, result);
        match &outcome {
            LoadOutcome::Accepted(text) => {
                if let Err(e) = self.show_text(text) {
                    log::warn!("CID {}: {e}", ticket.cid());
                }
            }
            LoadOutcome::Failed(e) => {
                log::warn!("CID {}: {e}", ticket.cid());
                self.fail_load(e.user_message());
            }
            LoadOutcome::Stale => {}
        }
        outcome
    }

    /// Parse and show connection-table text directly, cancelling any fetch
    /// in flight.
    ///
    /// # Errors
    ///
    /// The [`ParseError`]; the load state then holds the parse failure
    /// message.
    pub fn load_text(&mut self, text: &str) -> Result<(), ParseError> {
        self.loads.cancel();
        self.show_text(text)
    }

    fn show_text(&mut self, text: &str) -> Result<(), ParseError> {
        match structure::parse(text) {
            Ok(molecule) => {
                log::info!(
                    "loaded molecule: {} atoms, {} bonds",
                    molecule.atom_count(),
                    molecule.bond_count()
                );
                self.molecule = Some(molecule);
                let _ = self.rebuild();
                self.load_state = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.fail_load(PARSE_FAILURE_MESSAGE.to_owned());
                Err(e)
            }
        }
    }

    fn fail_load(&mut self, message: String) {
        self.molecule = None;
        let _ = self.lifecycle.clear_molecule();
        self.load_state = LoadState::Failed(message);
    }

    // -- Display --

    /// Change the display style and rebuild the molecule group.
    pub fn set_style(&mut self, style: DisplayStyle) {
        self.style = style;
        let _ = self.rebuild();
    }

    /// Rebuild the molecule group from the current molecule and style.
    fn rebuild(&mut self) -> Option<Framing> {
        let molecule = self.molecule.as_ref()?;
        let geometry = geometry::build(molecule, self.style);
        Some(
            self.lifecycle
                .apply_geometry(&geometry, self.ar.is_presenting()),
        )
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.lifecycle.resize(width, height);
    }

    /// Run one frame.
    pub fn tick(&mut self, source: FrameSource) -> TickOutcome {
        let presenting = self.ar.is_presenting();
        self.render_loop
            .tick(source, self.lifecycle.frame_parts(), presenting)
    }

    // -- AR --

    /// Probe AR capability (once).
    pub fn mount_ar(&mut self, platform: &mut dyn XrPlatform) {
        self.ar.mount(platform);
    }

    /// Deliver an asynchronous probe result.
    pub fn on_ar_probe_result(&mut self, result: Result<bool, ArCapabilityError>) {
        self.ar.on_probe_result(result);
    }

    /// Request an immersive session; refused while Start AR is disabled.
    ///
    /// # Errors
    ///
    /// [`ArSessionError::NotAvailable`] when [`Self::can_start_ar`] is
    /// false, otherwise whatever the platform reports.
    pub fn request_ar(
        &mut self,
        platform: &mut dyn XrPlatform,
    ) -> Result<(), ArSessionError> {
        if !self.can_start_ar() {
            return Err(ArSessionError::NotAvailable);
        }
        self.ar.request_session(platform)
    }

    /// Ask the platform to end the session.
    ///
    /// # Errors
    ///
    /// Whatever the platform reports.
    pub fn end_ar(
        &mut self,
        platform: &mut dyn XrPlatform,
    ) -> Result<(), ArSessionError> {
        self.ar.end_session(platform)
    }

    /// The session started: hand the view to the device pose.
    pub fn on_ar_session_start(&mut self) -> SessionTransition {
        let transition = self.ar.on_session_start();
        if transition == SessionTransition::Entered {
            self.lifecycle.controls_mut().0.enabled = false;
            self.lifecycle.reposition(true);
        }
        transition
    }

    /// The session ended: return to the orbit view.
    pub fn on_ar_session_end(&mut self) -> SessionTransition {
        let was_presenting = self.ar.is_presenting();
        let transition = self.ar.on_session_end();
        if transition == SessionTransition::Exited && was_presenting {
            self.leave_presentation();
        }
        transition
    }

    /// The session failed.
    pub fn on_ar_session_error(&mut self, error: &ArSessionError) -> SessionTransition {
        let was_presenting = self.ar.is_presenting();
        let transition = self.ar.on_session_error(error);
        if transition == SessionTransition::Failed && was_presenting {
            self.leave_presentation();
        }
        transition
    }

    /// Clear an AR error.
    pub fn acknowledge_ar_error(&mut self) {
        self.ar.acknowledge_error();
    }

    fn leave_presentation(&mut self) {
        self.lifecycle.controls_mut().0.enabled = true;
        self.lifecycle.reposition(false);
    }

    // -- Status --

    /// Inputs of the status text.
    #[must_use]
    pub fn status_inputs(&self) -> StatusInputs<'_> {
        StatusInputs {
            capability: self.ar.capability(),
            secure: self.ar.is_secure(),
            loading: self.load_state.is_loading(),
            load_error: self.load_state.error(),
            initialized: self.is_initialized(),
            session: self.ar.state(),
            ar_error: self.ar.error_message(),
        }
    }

    /// Status line under the Start AR control.
    #[must_use]
    pub fn status_message(&self) -> String {
        status::status_message(&self.status_inputs())
    }

    /// Banner above the viewport.
    #[must_use]
    pub fn ar_banner(&self) -> &'static str {
        status::ar_banner(&self.status_inputs())
    }

    /// Whether Start AR is enabled.
    #[must_use]
    pub fn can_start_ar(&self) -> bool {
        status::can_start_ar(&self.status_inputs())
    }

    // -- Teardown --

    /// Cancel the fetch in flight, stop the render loop and dispose the
    /// molecule group. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.loads.cancel();
        if let Some(handle) = self.loop_handle.take() {
            let _ = self.render_loop.stop(&handle);
            log::info!("molecule stage shut down");
        }
        self.molecule = None;
        let _ = self.lifecycle.clear_molecule();
    }
}

impl<B: RenderBackend> Drop for MoleculeStage<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
