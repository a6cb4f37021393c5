//! Keyboard and pointer routing onto the camera
//!
//! Pointer and scroll events are applied as they are drained from the window
//! queue; held movement keys are polled once per frame.

use glfw::{Action, Key, WindowEvent};

use crate::render::camera::{Camera, Movement};

/// Which keys drive which movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    /// Key and the direction it moves
    pub movement: Vec<(Key, Movement)>,
    /// Key that requests shutdown
    pub quit: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            movement: vec![
                (Key::W, Movement::FORWARD),
                (Key::S, Movement::BACKWARD),
                (Key::A, Movement::LEFT),
                (Key::D, Movement::RIGHT),
                (Key::Space, Movement::UP),
                (Key::LeftControl, Movement::DOWN),
            ],
            quit: Key::Escape,
        }
    }
}

impl KeyBindings {
    /// Directions whose keys `is_pressed` reports as held
    pub fn held(&self, is_pressed: impl Fn(Key) -> bool) -> Movement {
        self.movement
            .iter()
            .filter(|(key, _)| is_pressed(*key))
            .fold(Movement::empty(), |held, (_, movement)| held | *movement)
    }
}

/// What the frame loop must do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEffect {
    /// Nothing beyond the camera update
    None,
    /// Leave the loop
    Quit,
    /// The framebuffer changed size
    Resized(u32, u32),
}

/// Apply one window event to the camera
pub fn dispatch_event(camera: &mut Camera, bindings: &KeyBindings, event: &WindowEvent) -> InputEffect {
    match *event {
        WindowEvent::CursorPos(x, y) => {
            camera.on_pointer_move(x, y);
            InputEffect::None
        }
        WindowEvent::Scroll(_, y_offset) => {
            camera.on_scroll(y_offset);
            InputEffect::None
        }
        WindowEvent::Key(key, _, Action::Press, _) if key == bindings.quit => InputEffect::Quit,
        WindowEvent::Close => InputEffect::Quit,
        WindowEvent::FramebufferSize(width, height) => {
            InputEffect::Resized(width.max(0) as u32, height.max(0) as u32)
        }
        _ => InputEffect::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_held_combines_pressed_keys() {
        let bindings = KeyBindings::default();
        let held = bindings.held(|key| matches!(key, Key::W | Key::D));
        assert_eq!(held, Movement::FORWARD | Movement::RIGHT);
        assert!(bindings.held(|_| false).is_empty());
    }

    #[test]
    fn test_scroll_and_pointer_reach_camera() {
        let bindings = KeyBindings::default();
        let mut camera = Camera::default();

        assert_eq!(dispatch_event(&mut camera, &bindings, &WindowEvent::Scroll(0.0, 10.0)), InputEffect::None);
        assert_relative_eq!(camera.fov(), 35.0);

        dispatch_event(&mut camera, &bindings, &WindowEvent::CursorPos(100.0, 100.0));
        dispatch_event(&mut camera, &bindings, &WindowEvent::CursorPos(110.0, 100.0));
        assert_relative_eq!(camera.yaw(), -89.0, epsilon = 1e-4);
    }

    #[test]
    fn test_escape_and_close_quit() {
        let bindings = KeyBindings::default();
        let mut camera = Camera::default();
        let escape = WindowEvent::Key(Key::Escape, 0, Action::Press, glfw::Modifiers::empty());
        let release = WindowEvent::Key(Key::Escape, 0, Action::Release, glfw::Modifiers::empty());

        assert_eq!(dispatch_event(&mut camera, &bindings, &escape), InputEffect::Quit);
        assert_eq!(dispatch_event(&mut camera, &bindings, &release), InputEffect::None);
        assert_eq!(dispatch_event(&mut camera, &bindings, &WindowEvent::Close), InputEffect::Quit);
    }

    #[test]
    fn test_framebuffer_size_reports_resize() {
        let mut camera = Camera::default();
        let effect = dispatch_event(&mut camera, &KeyBindings::default(), &WindowEvent::FramebufferSize(1024, 0));
        assert_eq!(effect, InputEffect::Resized(1024, 0));
    }
}
