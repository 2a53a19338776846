use crate::vertex::{ClipSpaceVertex, Triangle};
use cgmath::{
    InnerSpace, Matrix, Matrix3 as Mat3, Matrix4 as Mat4, SquareMatrix, Vector3 as Vec3, Zero,
};

pub struct VertexShaderUniforms {
    pub model_matrix: Mat4<f32>,
    pub mvp_matrix: Mat4<f32>,
    pub normal_matrix: Mat3<f32>,
}

impl VertexShaderUniforms {
    pub fn new(model: Mat4<f32>, view: Mat4<f32>, projection: Mat4<f32>) -> Self {
        Self {
            model_matrix: model,
            mvp_matrix: projection * view * model,
            normal_matrix: normal_matrix(&model),
        }
    }
}

/// 模型矩阵左上 3x3 的逆转置。不可逆（缩放为零）时退回原矩阵，
/// 反正这种物体也画不出面积。
pub fn normal_matrix(model: &Mat4<f32>) -> Mat3<f32> {
    let upper = Mat3::from_cols(
        model.x.truncate(),
        model.y.truncate(),
        model.z.truncate(),
    );
    match upper.invert() {
        Some(inv) => inv.transpose(),
        None => upper,
    }
}

fn normalize_or_zero(v: Vec3<f32>) -> Vec3<f32> {
    if v.magnitude2() > 0.0 { v.normalize() } else { v }
}

pub trait VertexShader {
    // 接收一个模型空间的三角形和uniforms
    // 返回一个裁剪空间的三角形
    fn shade_triangle(
        &self,
        triangle: &Triangle,
        uniforms: &VertexShaderUniforms,
    ) -> [ClipSpaceVertex; 3];
}

pub struct DefaultVertexShader;

impl VertexShader for DefaultVertexShader {
    fn shade_triangle(
        &self,
        triangle: &Triangle,
        uniforms: &VertexShaderUniforms,
    ) -> [ClipSpaceVertex; 3] {
        triangle.vertices.map(|v| {
            // 切线和副切线跟随模型矩阵，法线用逆转置
            let to_world = |d: Vec3<f32>| {
                if d.is_zero() {
                    d
                } else {
                    normalize_or_zero((uniforms.model_matrix * d.extend(0.0)).truncate())
                }
            };
            ClipSpaceVertex {
                position: uniforms.mvp_matrix * v.pos.extend(1.0),
                world_pos: (uniforms.model_matrix * v.pos.extend(1.0)).truncate(),
                normal: normalize_or_zero(uniforms.normal_matrix * v.normal),
                uv: v.uv,
                tangent: to_world(v.tangent),
                bitangent: to_world(v.bitangent),
            }
        })
    }
}
