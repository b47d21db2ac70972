//! Continuous render loop subordinate to the AR session.
//!
//! The loop itself owns no scene state. Each [`RenderLoop::tick`] borrows
//! the scene, camera, controls and backend through [`FrameParts`], applies
//! one damping step, and draws one frame. While an immersive session is
//! presenting, window-driven ticks are suspended and only the session's
//! frame callback renders.

use crate::camera::controller::OrbitControls;
use crate::camera::core::Camera;
use crate::gpu::resources::RenderBackend;
use crate::scene::Scene;
use crate::util::frame_timing::FrameTiming;

/// Who is driving the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// The window's redraw/animation-frame callback.
    Window,
    /// The immersive session's frame callback.
    XrSession,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is not running; nothing was drawn.
    Stopped,
    /// Window tick while the XR session owns frame scheduling.
    Suspended,
    /// Window tick arrived before the frame-rate cap allows another frame.
    Paced,
    /// One frame was drawn.
    Rendered,
    /// The backend failed to draw; the loop keeps running.
    RenderFailed,
}

/// Identifies one started loop. Stale handles are ignored by
/// [`RenderLoop::stop`].
#[derive(Debug, PartialEq, Eq)]
pub struct LoopHandle(u64);

/// The pieces of the scene a tick needs.
pub struct FrameParts<'a, B: RenderBackend> {
    /// Scene to draw.
    pub scene: &'a Scene,
    /// Camera, moved by the controls' damping step.
    pub camera: &'a mut Camera,
    /// Orbit controls.
    pub controls: &'a mut OrbitControls,
    /// Renderer.
    pub backend: &'a mut B,
}

/// Start/stop state and pacing of the render loop.
#[derive(Debug)]
pub struct RenderLoop {
    active: Option<u64>,
    next_id: u64,
    timing: FrameTiming,
    failures: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    /// Stopped loop with unlimited frame rate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_target_fps(0)
    }

    /// Stopped loop whose window ticks are capped at `target_fps`
    /// (0 = unlimited).
    #[must_use]
    pub fn with_target_fps(target_fps: u32) -> Self {
        Self {
            active: None,
            next_id: 0,
            timing: FrameTiming::new(target_fps),
            failures: 0,
        }
    }

    /// Start the loop. Any previously started loop is superseded; its
    /// handle becomes stale.
    pub fn start(&mut self) -> LoopHandle {
        self.next_id += 1;
        if self.active.replace(self.next_id).is_some() {
            log::debug!("render loop restarted");
        }
        self.timing.restart();
        LoopHandle(self.next_id)
    }

    /// Stop the loop started with `handle`. Returns false (and does
    /// nothing) for a stale handle.
    pub fn stop(&mut self, handle: &LoopHandle) -> bool {
        if self.active == Some(handle.0) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Whether a loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Frame timing.
    #[must_use]
    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// Frames that failed to render since creation.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Run one frame.
    pub fn tick<B: RenderBackend>(
        &mut self,
        source: FrameSource,
        parts: FrameParts<'_, B>,
        presenting: bool,
    ) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Stopped;
        }
        if presenting && source == FrameSource::Window {
            return TickOutcome::Suspended;
        }
        if source == FrameSource::Window && !self.timing.should_render() {
            return TickOutcome::Paced;
        }

        if parts.controls.enabled {
            let _ = parts.controls.update(parts.camera);
        }
        match parts.backend.render(parts.scene, parts.camera) {
            Ok(()) => {
                let _ = self.timing.end_frame();
                TickOutcome::Rendered
            }
            Err(e) => {
                self.failures += 1;
                log::error!("frame render failed: {e}");
                TickOutcome::RenderFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::gpu::resources::HeadlessBackend;
    use crate::options::CameraOptions;

    struct Rig {
        scene: Scene,
        camera: Camera,
        controls: OrbitControls,
        backend: HeadlessBackend,
    }

    impl Rig {
        fn new() -> Self {
            let options = CameraOptions::default();
            Self {
                scene: Scene::new(),
                camera: Camera::from_options(&options, 1.0),
                controls: OrbitControls::new(&options),
                backend: HeadlessBackend::new(),
            }
        }

        fn parts(&mut self) -> FrameParts<'_, HeadlessBackend> {
            FrameParts {
                scene: &self.scene,
                camera: &mut self.camera,
                controls: &mut self.controls,
                backend: &mut self.backend,
            }
        }
    }

    #[test]
    fn stopped_loop_draws_nothing() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::new();
        assert_eq!(
            lp.tick(FrameSource::Window, rig.parts(), false),
            TickOutcome::Stopped
        );
        assert_eq!(rig.backend.frames_rendered, 0);
    }

    #[test]
    fn running_loop_draws_each_tick() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::new();
        let _handle = lp.start();
        for _ in 0..3 {
            assert_eq!(
                lp.tick(FrameSource::Window, rig.parts(), false),
                TickOutcome::Rendered
            );
        }
        assert_eq!(rig.backend.frames_rendered, 3);
        assert_eq!(lp.timing().frame_count(), 3);
    }

    #[test]
    fn window_ticks_suspend_while_presenting() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::new();
        let _handle = lp.start();
        assert_eq!(
            lp.tick(FrameSource::Window, rig.parts(), true),
            TickOutcome::Suspended
        );
        assert_eq!(
            lp.tick(FrameSource::XrSession, rig.parts(), true),
            TickOutcome::Rendered
        );
        assert_eq!(rig.backend.frames_rendered, 1);
    }

    #[test]
    fn capped_window_ticks_skip_early_frames() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::with_target_fps(1);
        let _handle = lp.start();
        assert_eq!(
            lp.tick(FrameSource::Window, rig.parts(), false),
            TickOutcome::Paced
        );
        assert_eq!(rig.backend.frames_rendered, 0);
        assert_eq!(lp.timing().frame_count(), 0);
        // The session's own frames are never capped.
        assert_eq!(
            lp.tick(FrameSource::XrSession, rig.parts(), true),
            TickOutcome::Rendered
        );
        assert_eq!(rig.backend.frames_rendered, 1);
    }

    #[test]
    fn stale_handle_is_ignored() {
        let mut lp = RenderLoop::new();
        let first = lp.start();
        let second = lp.start();
        assert!(!lp.stop(&first));
        assert!(lp.is_running());
        assert!(lp.stop(&second));
        assert!(!lp.is_running());
        assert!(!lp.stop(&second));
    }

    #[test]
    fn render_failure_keeps_loop_running() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::new();
        let _handle = lp.start();
        rig.backend.fail_next_render = Some("device lost".to_owned());
        assert_eq!(
            lp.tick(FrameSource::Window, rig.parts(), false),
            TickOutcome::RenderFailed
        );
        assert!(lp.is_running());
        assert_eq!(lp.failures(), 1);
        assert_eq!(
            lp.tick(FrameSource::Window, rig.parts(), false),
            TickOutcome::Rendered
        );
    }

    #[test]
    fn damping_runs_only_when_controls_enabled() {
        let mut rig = Rig::new();
        let mut lp = RenderLoop::new();
        let _handle = lp.start();
        rig.controls.rotate(Vec2::new(40.0, 0.0));
        let before = rig.camera.eye;
        rig.controls.enabled = false;
        let _ = lp.tick(FrameSource::Window, rig.parts(), false);
        assert_eq!(rig.camera.eye, before);
        rig.controls.enabled = true;
        let _ = lp.tick(FrameSource::Window, rig.parts(), false);
        assert_ne!(rig.camera.eye, before);
    }
}
