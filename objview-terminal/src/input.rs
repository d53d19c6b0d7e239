/// Terminal input mapping for the first-person camera
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use objview_core::{Camera, CameraMovement, CameraOptions};

use crate::CELL_ASPECT;

/// How long a key counts as held after a press or repeat when the terminal
/// does not report key releases
pub const HOLD_WINDOW: Duration = Duration::from_millis(200);

const MOVEMENT_KEYS: [(KeyCode, CameraMovement); 4] = [
    (KeyCode::Char('w'), CameraMovement::Forward),
    (KeyCode::Char('s'), CameraMovement::Backward),
    (KeyCode::Char('a'), CameraMovement::Left),
    (KeyCode::Char('d'), CameraMovement::Right),
];

/// Discrete requests produced by input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    Reload,
    ResetCamera,
    Resize(u16, u16),
}

/// Key state and accumulated mouse/scroll deltas between frames
#[derive(Debug)]
pub struct InputState {
    held: HashMap<KeyCode, Instant>,
    release_events: bool,
    drag_origin: Option<(u16, u16)>,
    look_delta: (f32, f32),
    scroll_delta: f32,
}

impl InputState {
    /// `release_events` is true when the terminal reports key releases
    pub fn new(release_events: bool) -> Self {
        Self {
            held: HashMap::new(),
            release_events,
            drag_origin: None,
            look_delta: (0.0, 0.0),
            scroll_delta: 0.0,
        }
    }

    pub fn handle_event(&mut self, event: &Event, now: Instant) -> Option<InputAction> {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                None
            }
            Event::Resize(width, height) => Some(InputAction::Resize(*width, *height)),
            _ => None,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Option<InputAction> {
        let code = match key.code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };

        match key.kind {
            KeyEventKind::Release => {
                self.held.remove(&code);
                return None;
            }
            KeyEventKind::Repeat => {
                self.held.insert(code, now);
                return None;
            }
            KeyEventKind::Press => {
                self.held.insert(code, now);
            }
        }

        match code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(InputAction::Quit),
            KeyCode::Char('q') | KeyCode::Esc => Some(InputAction::Quit),
            KeyCode::Char('r') => Some(InputAction::Reload),
            KeyCode::Char('c') => Some(InputAction::ResetCamera),
            _ => None,
        }
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_origin = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((column, row)) = self.drag_origin {
                    // Screen rows grow downward; pitch grows upward
                    self.look_delta.0 += f32::from(mouse.column) - f32::from(column);
                    self.look_delta.1 += f32::from(row) - f32::from(mouse.row);
                }
                self.drag_origin = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_origin = None;
            }
            MouseEventKind::ScrollUp => self.scroll_delta += 1.0,
            MouseEventKind::ScrollDown => self.scroll_delta -= 1.0,
            _ => {}
        }
    }

    pub fn is_held(&self, code: KeyCode, now: Instant) -> bool {
        self.held
            .get(&code)
            .is_some_and(|&at| self.release_events || now.duration_since(at) < HOLD_WINDOW)
    }

    /// Apply held keys and the deltas gathered since the last frame
    pub fn apply(&mut self, camera: &mut Camera, options: &CameraOptions, delta_time: f32, now: Instant) {
        for (code, direction) in MOVEMENT_KEYS {
            if self.is_held(code, now) {
                camera.translate(direction, delta_time);
            }
        }

        let step = options.look_rate * delta_time;
        let axis = |negative: KeyCode, positive: KeyCode| {
            f32::from(u8::from(self.is_held(positive, now))) - f32::from(u8::from(self.is_held(negative, now)))
        };
        let key_yaw = axis(KeyCode::Left, KeyCode::Right) * step;
        let key_pitch = axis(KeyCode::Down, KeyCode::Up) * step;

        let (dx, dy) = std::mem::take(&mut self.look_delta);
        camera.set_euler_angles(
            key_yaw + dx * options.sensitivity,
            key_pitch + dy * options.sensitivity * CELL_ASPECT,
        );

        let scroll = std::mem::take(&mut self.scroll_delta);
        if scroll != 0.0 {
            camera.set_zoom(scroll * options.zoom_step);
        }

        if !self.release_events {
            self.held.retain(|_, at| now.duration_since(*at) < HOLD_WINDOW);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_actions() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        assert_eq!(input.handle_event(&key('q'), now), Some(InputAction::Quit));
        assert_eq!(
            input.handle_event(&Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)), now),
            Some(InputAction::Quit)
        );
        assert_eq!(
            input.handle_event(&Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), now),
            Some(InputAction::Quit)
        );
        assert_eq!(input.handle_event(&key('R'), now), Some(InputAction::Reload));
        assert_eq!(input.handle_event(&key('c'), now), Some(InputAction::ResetCamera));
        assert_eq!(input.handle_event(&Event::Resize(80, 24), now), Some(InputAction::Resize(80, 24)));
        assert_eq!(input.handle_event(&key('w'), now), None);
    }

    #[test]
    fn test_held_key_moves_camera() {
        let mut input = InputState::new(false);
        let mut camera = Camera::default();
        let options = CameraOptions::default();
        let now = Instant::now();

        input.handle_event(&key('W'), now);
        input.apply(&mut camera, &options, 0.4, now);
        // speed 2.5 * 0.4 along -Z
        assert!((camera.position.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_held_key_expires_without_release_events() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        input.handle_event(&key('w'), now);
        assert!(input.is_held(KeyCode::Char('w'), now));
        assert!(!input.is_held(KeyCode::Char('w'), now + HOLD_WINDOW * 2));
    }

    #[test]
    fn test_release_event_clears_hold() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        input.handle_event(&key('d'), now);
        assert!(input.is_held(KeyCode::Char('d'), now + Duration::from_secs(5)));

        let release = KeyEvent::new_with_kind(KeyCode::Char('d'), KeyModifiers::NONE, KeyEventKind::Release);
        input.handle_event(&Event::Key(release), now);
        assert!(!input.is_held(KeyCode::Char('d'), now));
    }

    #[test]
    fn test_mouse_drag_looks_around() {
        let mut input = InputState::new(false);
        let mut camera = Camera::default();
        let options = CameraOptions::default();
        let now = Instant::now();

        input.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 10, 10), now);
        input.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 14, 9), now);
        input.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 14, 9), now);
        // moving without a button is ignored
        input.handle_event(&mouse(MouseEventKind::Moved, 40, 0), now);
        input.apply(&mut camera, &options, 0.0, now);

        assert!((camera.yaw() - (-90.0 + 4.0 * options.sensitivity)).abs() < 1e-4);
        assert!((camera.pitch() - options.sensitivity * CELL_ASPECT).abs() < 1e-4);

        // deltas are consumed by apply
        let yaw = camera.yaw();
        input.apply(&mut camera, &options, 0.0, now);
        assert_eq!(camera.yaw(), yaw);
    }

    #[test]
    fn test_scroll_zooms() {
        let mut input = InputState::new(false);
        let mut camera = Camera::default();
        let options = CameraOptions::default();
        let now = Instant::now();

        for _ in 0..3 {
            input.handle_event(&mouse(MouseEventKind::ScrollUp, 0, 0), now);
        }
        input.apply(&mut camera, &options, 0.0, now);
        assert!((camera.zoom() - 42.0).abs() < 1e-5);

        for _ in 0..10 {
            input.handle_event(&mouse(MouseEventKind::ScrollDown, 0, 0), now);
        }
        input.apply(&mut camera, &options, 0.0, now);
        assert_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn test_arrow_keys_look_at_fixed_rate() {
        let mut input = InputState::new(false);
        let mut camera = Camera::default();
        let options = CameraOptions::default();
        let now = Instant::now();

        input.handle_event(&Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)), now);
        input.apply(&mut camera, &options, 0.5, now);
        assert!((camera.pitch() - options.look_rate * 0.5).abs() < 1e-4);
    }
}
