//! Standalone molecule window backed by winit.
//!
//! The window runs one [`MoleculeStage`] on a wgpu backend. PubChem
//! downloads (feature `fetch`) happen on a worker thread and are handed
//! back to the event loop over a channel; the stage discards superseded
//! results.
//!
//! Keys: `1`/`2`/`3` switch between stick, spacefill and wireframe, `R`
//! resets the camera, `A` requests an AR session.
//!
//! ```no_run
//! # use molstage::viewer::{StructureSource, Viewer};
//! Viewer::builder()
//!     .with_source(StructureSource::Cid("2519".into()))
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::{path::PathBuf, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    ar::NoXrPlatform,
    camera::input::InputHandler,
    error::StageError,
    fetch::FetchError,
    gpu::render_context::RenderContext,
    options::{DisplayStyle, Options},
    render_loop::{FrameSource, TickOutcome},
    renderer::mesh_renderer::WgpuBackend,
    stage::{FetchTicket, MoleculeStage},
    structure::library::{self, Preset},
};

/// Where the displayed structure comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureSource {
    /// A built-in preset.
    Preset(Preset),
    /// A PubChem compound ID.
    Cid(String),
    /// A local connection-table file.
    File(PathBuf),
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    source: Option<StructureSource>,
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            source: None,
            options: None,
            title: "molstage".into(),
        }
    }

    /// Set the structure to show. Without one, the first preset is loaded.
    #[must_use]
    pub fn with_source(mut self, source: StructureSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            source: self
                .source
                .unwrap_or_else(|| StructureSource::Preset(library::default_for(None))),
            options: self.options.unwrap_or_default(),
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window that displays one molecule.
pub struct Viewer {
    source: StructureSource,
    options: Options,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// [`StageError::Viewer`] if the event loop cannot be created or
    /// exits abnormally.
    pub fn run(self) -> Result<(), StageError> {
        let event_loop =
            EventLoop::new().map_err(|e| StageError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            stage: None,
            input: InputHandler::new(),
            xr: NoXrPlatform,
            fetches: FetchChannel::new(),
            source: Some(self.source),
            options: self.options,
            title: self.title,
            last_status: String::new(),
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| StageError::Viewer(e.to_string()))
    }
}

// ── Fetch worker ─────────────────────────────────────────────────────────

type FetchResult = (FetchTicket, Result<String, FetchError>);

struct FetchChannel {
    tx: std::sync::mpsc::Sender<FetchResult>,
    rx: std::sync::mpsc::Receiver<FetchResult>,
}

impl FetchChannel {
    fn new() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self { tx, rx }
    }

    /// Download on a worker thread; the result comes back through
    /// [`Self::drain`].
    #[cfg(feature = "fetch")]
    fn spawn(&self, ticket: FetchTicket) {
        let tx = self.tx.clone();
        let _ = std::thread::spawn(move || {
            let result = crate::fetch::fetch_sdf(ticket.cid(), ticket.cancel_token());
            // The receiver is gone once the window closed.
            let _ = tx.send((ticket, result));
        });
    }

    #[cfg(not(feature = "fetch"))]
    fn spawn(&self, ticket: FetchTicket) {
        let result = Err(FetchError::Network(
            "built without the `fetch` feature".into(),
        ));
        let _ = self.tx.send((ticket, result));
    }

    fn drain(&self, stage: &mut MoleculeStage<WgpuBackend>) {
        while let Ok((ticket, result)) = self.rx.try_recv() {
            let _ = stage.complete_load(&ticket, result);
        }
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

struct ViewerApp {
    window: Option<Arc<Window>>,
    stage: Option<MoleculeStage<WgpuBackend>>,
    input: InputHandler,
    xr: NoXrPlatform,
    fetches: FetchChannel,
    /// Taken once the stage exists.
    source: Option<StructureSource>,
    options: Options,
    title: String,
    last_status: String,
}

/// Frames between FPS log lines.
const FPS_LOG_INTERVAL: u64 = 600;

fn viewport_size(inner: winit::dpi::PhysicalSize<u32>) -> (u32, u32) {
    (inner.width.max(1), inner.height.max(1))
}

impl ViewerApp {
    fn create_stage(
        &self,
        window: Arc<Window>,
    ) -> Result<MoleculeStage<WgpuBackend>, StageError> {
        let (width, height) = viewport_size(window.inner_size());
        let context = pollster::block_on(RenderContext::new(window, (width, height)))?;
        let backend = WgpuBackend::new(context);
        Ok(MoleculeStage::new(
            backend,
            &self.options,
            width as f32 / height as f32,
        ))
    }

    fn load(&mut self, source: StructureSource) {
        let Some(stage) = &mut self.stage else {
            return;
        };
        let ticket = match source {
            StructureSource::Preset(preset) => {
                log::info!("preset {}: {}", preset.name, preset.highlight);
                stage.select(preset)
            }
            StructureSource::Cid(cid) => stage.begin_load(&cid),
            StructureSource::File(path) => {
                match std::fs::read_to_string(&path) {
                    Ok(text) => {
                        if let Err(e) = stage.load_text(&text) {
                            log::error!("{}: {e}", path.display());
                        }
                    }
                    Err(e) => log::error!("{}: {e}", path.display()),
                }
                return;
            }
        };
        match ticket {
            Ok(ticket) => self.fetches.spawn(ticket),
            Err(e) => log::error!("{}", e.user_message()),
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let Some(stage) = &mut self.stage else {
            return;
        };
        let style = match code {
            KeyCode::Digit1 => Some(DisplayStyle::Stick),
            KeyCode::Digit2 => Some(DisplayStyle::Spacefill),
            KeyCode::Digit3 => Some(DisplayStyle::Wireframe),
            KeyCode::KeyR => {
                let (controls, camera) = stage.lifecycle_mut().controls_mut();
                controls.reset(camera);
                None
            }
            KeyCode::KeyA => {
                if let Err(e) = stage.request_ar(&mut self.xr) {
                    log::warn!("AR unavailable: {e}");
                }
                None
            }
            _ => None,
        };
        if let Some(style) = style {
            log::info!("display style: {style}");
            stage.set_style(style);
        }
    }

    fn log_status(&mut self, rendered: bool) {
        let Some(stage) = &self.stage else {
            return;
        };
        let timing = stage.render_loop().timing();
        if rendered && timing.frame_count() % FPS_LOG_INTERVAL == 0 {
            log::debug!("{:.1} fps", timing.fps());
        }
        let status = stage.status_message();
        if status != self.last_status {
            log::info!("{status}");
            self.last_status = status;
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.create_stage(window.clone()) {
            Ok(mut stage) => {
                stage.mount_ar(&mut self.xr);
                self.stage = Some(stage);
            }
            Err(e) => {
                log::error!("{e}");
                event_loop.exit();
                return;
            }
        }
        if let Some(source) = self.source.take() {
            self.load(source);
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(stage) = &mut self.stage {
            let (controls, camera) = stage.lifecycle_mut().controls_mut();
            if controls.enabled && self.input.handle_event(controls, camera, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(stage) = &mut self.stage {
                    stage.shutdown();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(stage) = &mut self.stage {
                    let (width, height) = viewport_size(size);
                    stage.resize(width, height);
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(stage) = &mut self.stage else {
                    return;
                };
                self.fetches.drain(stage);
                let outcome = stage.tick(FrameSource::Window);
                if outcome == TickOutcome::Stopped {
                    event_loop.exit();
                    return;
                }
                self.log_status(outcome == TickOutcome::Rendered);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.handle_key(code);
                    }
                }
            }

            _ => (),
        }
    }
}
