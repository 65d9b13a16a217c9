use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Scroll distance that counts as one wheel line for touchpads.
const PIXELS_PER_LINE: f32 = 20.0;

#[derive(Debug)]
pub enum UserEvent {
    ExitApp,
}

/// Turns absolute cursor positions into per-move offsets. The first
/// position after a reset yields no movement. Y grows upward.
#[derive(Debug, Default)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
}

impl MouseTracker {
    pub fn track(&mut self, x: f64, y: f64) -> (f32, f32) {
        let offset = match self.last {
            Some((last_x, last_y)) => ((x - last_x) as f32, (last_y - y) as f32),
            None => (0.0, 0.0),
        };
        self.last = Some((x, y));
        offset
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug)]
pub struct Inputs {
    frame_events: Vec<WindowEvent>,
    keys_state: [bool; 256],
    last_keys_state: [bool; 256],
    mouse: MouseTracker,
    mouse_offset: (f32, f32),
    pending_motion: (f64, f64),
    motion: (f32, f32),
    scroll: f32,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            frame_events: vec![],
            keys_state: [false; 256],
            last_keys_state: [false; 256],
            mouse: MouseTracker::default(),
            mouse_offset: (0.0, 0.0),
            pending_motion: (0.0, 0.0),
            motion: (0.0, 0.0),
            scroll: 0.0,
        }
    }
}

impl Inputs {
    fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event),
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(position.x, position.y)
            }
            WindowEvent::CursorLeft { .. } => self.mouse.reset(),
            WindowEvent::MouseWheel { delta, .. } => self.handle_scroll(delta),
            _ => (),
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        self.set_key(code, event.state == ElementState::Pressed);
    }

    fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if let Some(state) = self.keys_state.get_mut(code as usize) {
            *state = pressed;
        }
    }

    fn handle_cursor(&mut self, x: f64, y: f64) {
        let (dx, dy) = self.mouse.track(x, y);
        self.mouse_offset.0 += dx;
        self.mouse_offset.1 += dy;
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => {
                position.y as f32 / PIXELS_PER_LINE
            }
        };
    }

    fn key_state(state: &[bool; 256], code: KeyCode) -> bool {
        state.get(code as usize).copied().unwrap_or(false)
    }

    pub fn key_held(&self, code: KeyCode) -> bool {
        Self::key_state(&self.keys_state, code)
    }

    pub fn key_pressed(&self, code: KeyCode) -> bool {
        Self::key_state(&self.keys_state, code)
            && !Self::key_state(&self.last_keys_state, code)
    }

    /// Cursor movement accumulated over the last frame.
    pub fn mouse_offset(&self) -> (f32, f32) {
        self.mouse_offset
    }

    /// Raw pointer motion over the last frame, y up. Unlike the cursor
    /// offset it keeps coming while the cursor is locked or pinned at an
    /// edge.
    pub fn mouse_motion(&self) -> (f32, f32) {
        self.motion
    }

    /// Wheel lines scrolled over the last frame, positive away from the user.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Forget the last cursor position, e.g. after the cursor was grabbed.
    pub fn reset_mouse(&mut self) {
        self.mouse.reset();
    }

    pub fn on_event(&mut self, event: WindowEvent) {
        self.frame_events.push(event);
    }

    /// Accumulates a `DeviceEvent::MouseMotion` delta until the next update.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.pending_motion.0 += dx;
        self.pending_motion.1 += dy;
    }

    pub fn update(&mut self) {
        self.last_keys_state.copy_from_slice(&self.keys_state);
        self.mouse_offset = (0.0, 0.0);
        self.scroll = 0.0;
        let (dx, dy) = std::mem::take(&mut self.pending_motion);
        self.motion = (dx as f32, -dy as f32);
        let events = std::mem::take(&mut self.frame_events);
        for event in events {
            self.handle_event(event);
        }
    }
}
