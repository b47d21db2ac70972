use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use super::controller::OrbitControls;
use super::core::Camera;

/// Translates window pointer events into orbit-control input.
///
/// Left drag rotates, shift + left drag or right drag pans, the wheel zooms.
#[derive(Debug, Default)]
pub struct InputHandler {
    last_mouse_pos: Option<Vec2>,
    rotate_pressed: bool,
    pan_pressed: bool,
    shift_pressed: bool,
}

impl InputHandler {
    /// Handler with no buttons held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event was consumed by the camera.
    pub fn handle_event(
        &mut self,
        controls: &mut OrbitControls,
        camera: &Camera,
        event: &WindowEvent,
    ) -> bool {
        match event {
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.rotate_pressed = pressed,
                    MouseButton::Right => self.pan_pressed = pressed,
                    _ => return false,
                }
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift_pressed = modifiers.state().shift_key();
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = Vec2::new(position.x as f32, position.y as f32);
                let delta = self
                    .last_mouse_pos
                    .map_or(Vec2::ZERO, |last| current - last);
                self.last_mouse_pos = Some(current);

                if self.pan_pressed || (self.rotate_pressed && self.shift_pressed) {
                    controls.pan(delta, camera);
                } else if self.rotate_pressed {
                    controls.rotate(delta);
                }
                self.rotate_pressed || self.pan_pressed
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_mouse_pos = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                controls.zoom(scroll);
                true
            }
            _ => false,
        }
    }
}
