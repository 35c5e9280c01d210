//! Keyboard and mouse accumulation between frames.
//!
//! Held movement keys and mouse drags collect here and are drained once per
//! timestep; discrete actions queue as [`ViewerCommand`]s in arrival order.

use glam::Vec3;
use winit::keyboard::{Key, NamedKey};

/// A discrete action triggered by a key press.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ViewerCommand {
    ToggleWorld,
    NextShader,
    PrevShader,
    ResetVariables,
    SaveSettings,
    Recenter,
    ResetChassis,
    ToggleFulldome,
    ToggleDashboard,
    FboScaleUp,
    FboScaleDown,
    SelectPrevVariable,
    SelectNextVariable,
    NudgeVariable(f32),
    Quit,
}

#[derive(Clone, Copy, Debug, Default)]
struct HeldAxes {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

/// Everything the frame consumes from the input devices.
#[derive(Clone, Debug, Default)]
pub(crate) struct FrameInputs {
    /// Chassis-local translation, already scaled by speed and elapsed time.
    pub step: Vec3,
    /// Yaw and pitch deltas in radians.
    pub look: (f32, f32),
    pub commands: Vec<ViewerCommand>,
}

#[derive(Debug, Default)]
pub(crate) struct InputState {
    held: HeldAxes,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    pending_drag: (f32, f32),
    commands: Vec<ViewerCommand>,
}

impl InputState {
    /// Routes one key event. Returns false when the key is not bound.
    pub(crate) fn handle_key(&mut self, key: &Key, pressed: bool, repeat: bool) -> bool {
        if let Some(axis) = self.axis_flag(key) {
            *axis = pressed;
            return true;
        }

        if !pressed {
            return false;
        }

        let command = match key {
            Key::Named(NamedKey::Space) => Some(ViewerCommand::ToggleWorld),
            Key::Named(NamedKey::F5) => Some(ViewerCommand::SaveSettings),
            Key::Named(NamedKey::Home) => Some(ViewerCommand::Recenter),
            Key::Named(NamedKey::End) => Some(ViewerCommand::ResetChassis),
            Key::Named(NamedKey::PageUp) => Some(ViewerCommand::FboScaleUp),
            Key::Named(NamedKey::PageDown) => Some(ViewerCommand::FboScaleDown),
            Key::Named(NamedKey::Escape) => Some(ViewerCommand::Quit),
            Key::Character(value) => match value.to_ascii_lowercase().as_str() {
                "n" => Some(ViewerCommand::NextShader),
                "b" => Some(ViewerCommand::PrevShader),
                "r" => Some(ViewerCommand::ResetVariables),
                "f" => Some(ViewerCommand::ToggleFulldome),
                "t" => Some(ViewerCommand::ToggleDashboard),
                "[" => Some(ViewerCommand::SelectPrevVariable),
                "]" => Some(ViewerCommand::SelectNextVariable),
                "-" => Some(ViewerCommand::NudgeVariable(-1.0)),
                "=" | "+" => Some(ViewerCommand::NudgeVariable(1.0)),
                _ => None,
            },
            _ => None,
        };

        let Some(command) = command else {
            return false;
        };

        // Nudges and scale steps repeat while held; the rest fire once.
        let repeats = matches!(
            command,
            ViewerCommand::NudgeVariable(_)
                | ViewerCommand::FboScaleUp
                | ViewerCommand::FboScaleDown
        );
        if !repeat || repeats {
            self.commands.push(command);
        }
        true
    }

    fn axis_flag(&mut self, key: &Key) -> Option<&mut bool> {
        let Key::Character(value) = key else {
            return None;
        };
        match value.to_ascii_lowercase().as_str() {
            "w" => Some(&mut self.held.forward),
            "s" => Some(&mut self.held.back),
            "a" => Some(&mut self.held.left),
            "d" => Some(&mut self.held.right),
            "e" => Some(&mut self.held.up),
            "q" => Some(&mut self.held.down),
            _ => None,
        }
    }

    pub(crate) fn mouse_button(&mut self, pressed: bool) {
        self.dragging = pressed;
        if !pressed {
            self.last_cursor = None;
        }
    }

    /// One render-scale step per wheel event; only the sign matters.
    pub(crate) fn scroll(&mut self, vertical: f32) {
        if vertical > 0.0 {
            self.commands.push(ViewerCommand::FboScaleUp);
        } else if vertical < 0.0 {
            self.commands.push(ViewerCommand::FboScaleDown);
        }
    }

    pub(crate) fn cursor_moved(&mut self, x: f64, y: f64) {
        if self.dragging {
            if let Some((last_x, last_y)) = self.last_cursor {
                self.pending_drag.0 += (x - last_x) as f32;
                self.pending_drag.1 += (y - last_y) as f32;
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Consumes the accumulated state for one timestep.
    pub(crate) fn drain(&mut self, dt: f32, speed: f32, sensitivity: f32) -> FrameInputs {
        let axes = &self.held;
        let step = Vec3::new(
            axis(axes.right) - axis(axes.left),
            axis(axes.up) - axis(axes.down),
            axis(axes.back) - axis(axes.forward),
        ) * (speed * dt);

        let (drag_x, drag_y) = std::mem::take(&mut self.pending_drag);
        // Dragging right looks right (negative yaw); dragging up looks up.
        let look = (-drag_x * sensitivity, -drag_y * sensitivity);

        FrameInputs {
            step,
            look,
            commands: std::mem::take(&mut self.commands),
        }
    }
}

fn axis(held: bool) -> f32 {
    if held {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chr(s: &str) -> Key {
        Key::Character(s.into())
    }

    #[test]
    fn held_axes_compose_into_a_step() {
        let mut input = InputState::default();
        input.handle_key(&chr("w"), true, false);
        input.handle_key(&chr("d"), true, false);

        let frame = input.drain(0.5, 2.0, 1.0);
        assert_eq!(frame.step, Vec3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn releasing_a_key_stops_its_axis() {
        let mut input = InputState::default();
        input.handle_key(&chr("w"), true, false);
        input.handle_key(&chr("w"), false, false);

        let frame = input.drain(1.0, 1.0, 1.0);
        assert_eq!(frame.step, Vec3::ZERO);
    }

    #[test]
    fn dragging_accumulates_look_deltas() {
        let mut input = InputState::default();
        input.cursor_moved(100.0, 100.0);
        input.mouse_button(true);
        input.cursor_moved(100.0, 100.0);
        input.cursor_moved(110.0, 96.0);

        let frame = input.drain(0.016, 1.0, 0.01);
        assert!((frame.look.0 - (-0.1)).abs() < 1e-6);
        assert!((frame.look.1 - 0.04).abs() < 1e-6);
    }

    #[test]
    fn cursor_motion_without_drag_is_ignored() {
        let mut input = InputState::default();
        input.cursor_moved(0.0, 0.0);
        input.cursor_moved(50.0, 50.0);

        let frame = input.drain(0.016, 1.0, 0.01);
        assert_eq!(frame.look, (0.0, 0.0));
    }

    #[test]
    fn discrete_commands_fire_once_per_press() {
        let mut input = InputState::default();
        input.handle_key(&Key::Named(NamedKey::Space), true, false);
        input.handle_key(&Key::Named(NamedKey::Space), true, true);

        let frame = input.drain(0.016, 1.0, 1.0);
        assert_eq!(frame.commands, vec![ViewerCommand::ToggleWorld]);
    }

    #[test]
    fn nudges_repeat_while_held() {
        let mut input = InputState::default();
        input.handle_key(&chr("="), true, false);
        input.handle_key(&chr("="), true, true);
        input.handle_key(&chr("="), true, true);

        let frame = input.drain(0.016, 1.0, 1.0);
        assert_eq!(frame.commands.len(), 3);
        assert!(frame
            .commands
            .iter()
            .all(|c| *c == ViewerCommand::NudgeVariable(1.0)));
    }

    #[test]
    fn scroll_steps_the_render_scale_by_sign() {
        let mut input = InputState::default();
        input.scroll(1.5);
        input.scroll(-0.2);
        input.scroll(0.0);

        let frame = input.drain(0.016, 1.0, 1.0);
        assert_eq!(
            frame.commands,
            vec![ViewerCommand::FboScaleUp, ViewerCommand::FboScaleDown]
        );
    }

    #[test]
    fn drain_clears_queued_commands() {
        let mut input = InputState::default();
        input.handle_key(&Key::Named(NamedKey::Escape), true, false);
        let first = input.drain(0.016, 1.0, 1.0);
        assert_eq!(first.commands, vec![ViewerCommand::Quit]);

        let second = input.drain(0.016, 1.0, 1.0);
        assert!(second.commands.is_empty());
    }
}
