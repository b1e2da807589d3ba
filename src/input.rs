//! Keyboard and mouse bindings.
//!
//! Window events are translated into [`InputEvent`]s and dispatched to
//! callbacks registered on [`InputBindings`]. Callbacks get mutable access to
//! the camera, which is what the demo scenes steer with. Held keys fire once
//! per frame through [`InputBindings::dispatch_held`].

use std::collections::{HashMap, HashSet};

use winit::{
    event::{ElementState, MouseScrollDelta},
    keyboard::KeyCode,
};

use crate::camera::Camera;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,
    Up, Down, Left, Right,
    Space, Enter, Escape, Tab, Backspace,
    LeftShift, RightShift, LeftControl, RightControl, LeftAlt, RightAlt,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
}

impl Key {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        use KeyCode as C;
        let key = match code {
            C::KeyA => Key::A,
            C::KeyB => Key::B,
            C::KeyC => Key::C,
            C::KeyD => Key::D,
            C::KeyE => Key::E,
            C::KeyF => Key::F,
            C::KeyG => Key::G,
            C::KeyH => Key::H,
            C::KeyI => Key::I,
            C::KeyJ => Key::J,
            C::KeyK => Key::K,
            C::KeyL => Key::L,
            C::KeyM => Key::M,
            C::KeyN => Key::N,
            C::KeyO => Key::O,
            C::KeyP => Key::P,
            C::KeyQ => Key::Q,
            C::KeyR => Key::R,
            C::KeyS => Key::S,
            C::KeyT => Key::T,
            C::KeyU => Key::U,
            C::KeyV => Key::V,
            C::KeyW => Key::W,
            C::KeyX => Key::X,
            C::KeyY => Key::Y,
            C::KeyZ => Key::Z,
            C::Digit0 => Key::Digit0,
            C::Digit1 => Key::Digit1,
            C::Digit2 => Key::Digit2,
            C::Digit3 => Key::Digit3,
            C::Digit4 => Key::Digit4,
            C::Digit5 => Key::Digit5,
            C::Digit6 => Key::Digit6,
            C::Digit7 => Key::Digit7,
            C::Digit8 => Key::Digit8,
            C::Digit9 => Key::Digit9,
            C::ArrowUp => Key::Up,
            C::ArrowDown => Key::Down,
            C::ArrowLeft => Key::Left,
            C::ArrowRight => Key::Right,
            C::Space => Key::Space,
            C::Enter => Key::Enter,
            C::Escape => Key::Escape,
            C::Tab => Key::Tab,
            C::Backspace => Key::Backspace,
            C::ShiftLeft => Key::LeftShift,
            C::ShiftRight => Key::RightShift,
            C::ControlLeft => Key::LeftControl,
            C::ControlRight => Key::RightControl,
            C::AltLeft => Key::LeftAlt,
            C::AltRight => Key::RightAlt,
            C::F1 => Key::F1,
            C::F2 => Key::F2,
            C::F3 => Key::F3,
            C::F4 => Key::F4,
            C::F5 => Key::F5,
            C::F6 => Key::F6,
            C::F7 => Key::F7,
            C::F8 => Key::F8,
            C::F9 => Key::F9,
            C::F10 => Key::F10,
            C::F11 => Key::F11,
            C::F12 => Key::F12,
            _ => return None,
        };
        Some(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            winit::event::MouseButton::Back => MouseButton::Other(3),
            winit::event::MouseButton::Forward => MouseButton::Other(4),
            winit::event::MouseButton::Other(n) => MouseButton::Other(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    /// Cursor position in physical pixels and the movement since the last one.
    MouseMove { x: f64, y: f64, dx: f64, dy: f64 },
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    /// Scroll in lines, positive away from the user.
    MouseWheel(f32),
}

impl InputEvent {
    pub fn key(key: Key, state: ElementState) -> Self {
        match state {
            ElementState::Pressed => InputEvent::KeyDown(key),
            ElementState::Released => InputEvent::KeyUp(key),
        }
    }

    pub fn mouse_button(button: MouseButton, state: ElementState) -> Self {
        match state {
            ElementState::Pressed => InputEvent::MouseDown(button),
            ElementState::Released => InputEvent::MouseUp(button),
        }
    }

    pub fn wheel(delta: MouseScrollDelta) -> Self {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            // roughly one line per 20 pixels
            MouseScrollDelta::PixelDelta(p) => (p.y / 20.0) as f32,
        };
        InputEvent::MouseWheel(lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
    Wheel,
}

impl InputEvent {
    fn mouse_kind(&self) -> Option<MouseEventKind> {
        match self {
            InputEvent::MouseMove { .. } => Some(MouseEventKind::Move),
            InputEvent::MouseDown(_) => Some(MouseEventKind::Down),
            InputEvent::MouseUp(_) => Some(MouseEventKind::Up),
            InputEvent::MouseWheel(_) => Some(MouseEventKind::Wheel),
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => None,
        }
    }
}

pub type KeyCallback = Box<dyn FnMut(&mut Camera) + Send>;
pub type MouseCallback = Box<dyn FnMut(&InputEvent, &mut Camera) + Send>;

/// Callbacks by key and mouse event, plus the set of held keys.
#[derive(Default)]
pub struct InputBindings {
    on_down: HashMap<Key, Vec<KeyCallback>>,
    on_up: HashMap<Key, Vec<KeyCallback>>,
    on_hold: HashMap<Key, Vec<KeyCallback>>,
    on_mouse: HashMap<MouseEventKind, Vec<MouseCallback>>,
    held: HashSet<Key>,
    cursor: Option<(f64, f64)>,
}

impl InputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_key_down(&mut self, key: Key, callback: impl FnMut(&mut Camera) + Send + 'static) {
        self.on_down.entry(key).or_default().push(Box::new(callback));
    }

    pub fn bind_key_up(&mut self, key: Key, callback: impl FnMut(&mut Camera) + Send + 'static) {
        self.on_up.entry(key).or_default().push(Box::new(callback));
    }

    /// Fires once per frame while `key` is held.
    pub fn bind_key_hold(&mut self, key: Key, callback: impl FnMut(&mut Camera) + Send + 'static) {
        self.on_hold.entry(key).or_default().push(Box::new(callback));
    }

    pub fn bind_mouse(
        &mut self,
        kind: MouseEventKind,
        callback: impl FnMut(&InputEvent, &mut Camera) + Send + 'static,
    ) {
        self.on_mouse.entry(kind).or_default().push(Box::new(callback));
    }

    pub fn clear(&mut self) {
        self.on_down.clear();
        self.on_up.clear();
        self.on_hold.clear();
        self.on_mouse.clear();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Movement relative to the previous cursor position, zero for the first.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> InputEvent {
        let (dx, dy) = match self.cursor {
            Some((px, py)) => (x - px, y - py),
            None => (0.0, 0.0),
        };
        self.cursor = Some((x, y));
        InputEvent::MouseMove { x, y, dx, dy }
    }

    /// Run the callbacks bound to `event`. Repeated key-down events of a
    /// held key are dropped.
    pub fn handle(&mut self, event: &InputEvent, camera: &mut Camera) {
        match event {
            InputEvent::KeyDown(key) => {
                if self.held.insert(*key) {
                    run_key(&mut self.on_down, *key, camera);
                }
            }
            InputEvent::KeyUp(key) => {
                self.held.remove(key);
                run_key(&mut self.on_up, *key, camera);
            }
            _ => {
                if let Some(callbacks) = event.mouse_kind().and_then(|k| self.on_mouse.get_mut(&k)) {
                    for callback in callbacks {
                        callback(event, camera);
                    }
                }
            }
        }
    }

    pub fn dispatch_held(&mut self, camera: &mut Camera) {
        for key in &self.held {
            if let Some(callbacks) = self.on_hold.get_mut(key) {
                for callback in callbacks {
                    callback(camera);
                }
            }
        }
    }

    /// Forget held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
    }
}

fn run_key(map: &mut HashMap<Key, Vec<KeyCallback>>, key: Key, camera: &mut Camera) {
    if let Some(callbacks) = map.get_mut(&key) {
        for callback in callbacks {
            callback(camera);
        }
    }
}
