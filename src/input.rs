use cgmath::Vector3 as Vec3;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window};

use crate::camera::{Camera, CameraMovement};

/// 一帧内采集到的输入，不含任何原始键码
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub quit: bool,
    pub movement: Vec<CameraMovement>,
    pub blur_held: bool,
    pub toggle_spot_light: bool,
    pub toggle_green_light: bool,
    pub screenshot: bool,
    /// 鼠标拖动偏移，y 向上为正
    pub mouse_delta: Option<(f32, f32)>,
    pub scroll: f32,
    pub window_size: (usize, usize),
}

/// 记录上一次鼠标位置，首次按下时不产生跳变
#[derive(Debug, Default)]
pub struct MouseTracker {
    last: Option<(f32, f32)>,
}

impl MouseTracker {
    pub fn track(&mut self, position: Option<(f32, f32)>, dragging: bool) -> Option<(f32, f32)> {
        let Some((x, y)) = position.filter(|_| dragging) else {
            self.last = None;
            return None;
        };
        let delta = self.last.map(|(last_x, last_y)| (x - last_x, last_y - y));
        self.last = Some((x, y));
        delta
    }
}

impl InputSnapshot {
    pub fn capture(window: &Window, mouse: &mut MouseTracker) -> Self {
        let movement = [
            (Key::W, CameraMovement::Forward),
            (Key::S, CameraMovement::Backward),
            (Key::A, CameraMovement::Left),
            (Key::D, CameraMovement::Right),
        ]
        .into_iter()
        .filter(|(key, _)| window.is_key_down(*key))
        .map(|(_, direction)| direction)
        .collect();

        let dragging = window.get_mouse_down(MouseButton::Left);
        let mouse_delta = mouse.track(window.get_mouse_pos(MouseMode::Pass), dragging);

        Self {
            quit: window.is_key_down(Key::Escape),
            movement,
            blur_held: window.is_key_down(Key::LeftShift),
            toggle_spot_light: window.is_key_pressed(Key::X, KeyRepeat::No),
            toggle_green_light: window.is_key_pressed(Key::G, KeyRepeat::No),
            screenshot: window.is_key_pressed(Key::P, KeyRepeat::No),
            mouse_delta,
            scroll: window.get_scroll_wheel().map(|(_, y)| y).unwrap_or(0.0),
            window_size: window.get_size(),
        }
    }
}

/// 每帧的显式应用状态，只在帧线程上读写
#[derive(Debug, Clone)]
pub struct AppState {
    pub camera: Camera,
    pub blur: bool,
    pub spot_light_on: bool,
    pub green_light: bool,
    pub quit_requested: bool,
    pub screenshot_requested: bool,
}

impl AppState {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            blur: false,
            spot_light_on: false,
            green_light: false,
            quit_requested: false,
            screenshot_requested: false,
        }
    }

    pub fn camera_position(&self) -> Vec3<f32> {
        self.camera.position
    }

    pub fn apply_input(&mut self, input: &InputSnapshot, delta_time: f32) {
        self.quit_requested |= input.quit;

        for &direction in &input.movement {
            self.camera.process_keyboard(direction, delta_time);
        }
        if let Some((dx, dy)) = input.mouse_delta {
            self.camera.process_mouse_movement(dx, dy);
        }
        if input.scroll != 0.0 {
            self.camera.process_mouse_scroll(input.scroll);
        }

        // 模糊只在按住时生效，另外两个是按下切换
        self.blur = input.blur_held;
        if input.toggle_spot_light {
            self.spot_light_on = !self.spot_light_on;
            log::info!("手电筒: {}", if self.spot_light_on { "开" } else { "关" });
        }
        if input.toggle_green_light {
            self.green_light = !self.green_light;
            log::info!("绿色点光源: {}", if self.green_light { "开" } else { "关" });
        }
        self.screenshot_requested = input.screenshot;
    }
}
