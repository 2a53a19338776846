use cgmath::{InnerSpace, Matrix4 as Mat4, Point3, Vector3 as Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    mat: Mat4<f32>,
}

impl Frustum {
    /// fovy 为弧度
    #[rustfmt::skip]
    pub fn new(near: f32, aspect: f32, far: f32, fovy: f32) -> Self {
        let tan_half_fovy = (fovy / 2.0).tan();
        let a = 1.0 / (aspect * tan_half_fovy);
        let b = 1.0 / tan_half_fovy;
        let c = -(far + near) / (far - near);
        let d = -2.0 * far * near / (far - near);

        // projection
        let mat = Mat4::new(
            a,    0.0,   0.0,   0.0,
            0.0,  b,     0.0,   0.0,
            0.0,  0.0,   c,    -1.0,
            0.0,  0.0,   d,     0.0,
        );

        Self { mat }
    }

    pub fn get_mat(&self) -> &Mat4<f32> {
        &self.mat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

const SPEED: f32 = 2.5;
const SENSITIVITY: f32 = 0.1;
const MAX_ZOOM: f32 = 45.0;

/// 第一人称相机：偏航/俯仰（角度制）+ 缩放（视野角度）
#[derive(Debug, Clone)]
pub struct Camera {
    pub(crate) position: Vec3<f32>,
    pub(crate) front: Vec3<f32>,
    up: Vec3<f32>,
    right: Vec3<f32>,
    world_up: Vec3<f32>,
    pub(crate) yaw: f32,
    pub(crate) pitch: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    pub(crate) zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3<f32>, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            world_up: Vec3::new(0.0, 1.0, 0.0),
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: MAX_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn get_view_mat(&self) -> Mat4<f32> {
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        Mat4::look_at_rh(eye, eye + self.front, self.up)
    }

    /// 投影视锥：视野取当前缩放
    pub fn get_frustum(&self, aspect: f32, near: f32, far: f32) -> Frustum {
        Frustum::new(near, aspect, far, self.zoom.to_radians())
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        // 避免万向节翻转
        self.pitch = self.pitch.clamp(-89.0, 89.0);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(1.0, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
