use cgmath::{Matrix4 as Mat4, Vector3 as Vec3};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RenderError;
use crate::texture::Texture;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vec3<f32>),
    Mat4(Mat4<f32>),
}

/// 按名字存放的 uniform 与纹理绑定，相当于一个着色器程序的状态。
/// 着色器在每次绘制前一次性解析成强类型参数，逐像素不再查表。
#[derive(Debug, Clone, Default)]
pub struct Uniforms {
    values: HashMap<String, UniformValue>,
    textures: HashMap<String, Arc<Texture>>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.values.insert(name.to_string(), UniformValue::Bool(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.values.insert(name.to_string(), UniformValue::Int(value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_string(), UniformValue::Float(value));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3<f32>) {
        self.values.insert(name.to_string(), UniformValue::Vec3(value));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4<f32>) {
        self.values.insert(name.to_string(), UniformValue::Mat4(value));
    }

    pub fn bind_texture(&mut self, name: &str, texture: Arc<Texture>) {
        self.textures.insert(name.to_string(), texture);
    }

    pub fn unbind_texture(&mut self, name: &str) {
        self.textures.remove(name);
    }

    fn get(&self, name: &str) -> Result<UniformValue, RenderError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::MissingUniform(name.to_string()))
    }

    fn type_error(name: &str, expected: &'static str) -> RenderError {
        RenderError::UniformType {
            name: name.to_string(),
            expected,
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, RenderError> {
        match self.get(name)? {
            UniformValue::Bool(v) => Ok(v),
            _ => Err(Self::type_error(name, "bool")),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i32, RenderError> {
        match self.get(name)? {
            UniformValue::Int(v) => Ok(v),
            _ => Err(Self::type_error(name, "int")),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f32, RenderError> {
        match self.get(name)? {
            UniformValue::Float(v) => Ok(v),
            _ => Err(Self::type_error(name, "float")),
        }
    }

    pub fn get_vec3(&self, name: &str) -> Result<Vec3<f32>, RenderError> {
        match self.get(name)? {
            UniformValue::Vec3(v) => Ok(v),
            _ => Err(Self::type_error(name, "vec3")),
        }
    }

    pub fn get_mat4(&self, name: &str) -> Result<Mat4<f32>, RenderError> {
        match self.get(name)? {
            UniformValue::Mat4(v) => Ok(v),
            _ => Err(Self::type_error(name, "mat4")),
        }
    }

    pub fn texture(&self, name: &str) -> Option<Arc<Texture>> {
        self.textures.get(name).cloned()
    }

    pub fn require_texture(&self, name: &str) -> Result<Arc<Texture>, RenderError> {
        self.texture(name)
            .ok_or_else(|| RenderError::MissingUniform(name.to_string()))
    }
}
