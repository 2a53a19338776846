//! 法线贴图所需的切线空间计算
//!
//! 一个平面四边形按 (0,1,2) 和 (0,2,3) 拆成两个三角形，
//! 每个三角形各自解一次 2x2 线性方程组，得到切线 T 和副切线 B。

use cgmath::{InnerSpace, Vector2 as Vec2, Vector3 as Vec3};
use thiserror::Error;

/// |det| 与两条 UV 边长乘积之比低于此值时视为奇异，与 UV 的整体缩放无关
const DEGENERATE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TangentError {
    #[error("第{triangle}个三角形的UV差值行列式为零 (det = {determinant})，无法求解切线")]
    DegenerateUv { triangle: usize, determinant: f32 },
    #[error("第{triangle}个三角形的切线结果不是有限值")]
    NonFinite { triangle: usize },
}

/// 平面四边形面片：四个角点、一条共享法线、四组纹理坐标
#[derive(Debug, Clone, Copy)]
pub struct QuadPatch {
    pub positions: [Vec3<f32>; 4],
    pub uvs: [Vec2<f32>; 4],
    pub normal: Vec3<f32>,
}

/// 单个三角形的切线基
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3<f32>,
    pub bitangent: Vec3<f32>,
}

/// 四边形两个三角形各自的切线基，顺序对应 (0,1,2) 与 (0,2,3)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadTangents {
    pub first: TangentBasis,
    pub second: TangentBasis,
}

impl QuadPatch {
    pub fn new(positions: [Vec3<f32>; 4], uvs: [Vec2<f32>; 4], normal: Vec3<f32>) -> Self {
        Self {
            positions,
            uvs,
            normal,
        }
    }

    /// 两个三角形的角点下标
    pub const TRIANGLES: [[usize; 3]; 2] = [[0, 1, 2], [0, 2, 3]];
}

/// 求解单个三角形的切线与副切线（未归一化，长度反映UV缩放）
pub fn compute_triangle_tangent(
    positions: [Vec3<f32>; 3],
    uvs: [Vec2<f32>; 3],
) -> Result<TangentBasis, TangentError> {
    solve_triangle(positions, uvs, 0)
}

fn solve_triangle(
    positions: [Vec3<f32>; 3],
    uvs: [Vec2<f32>; 3],
    triangle: usize,
) -> Result<TangentBasis, TangentError> {
    let edge1 = positions[1] - positions[0];
    let edge2 = positions[2] - positions[0];
    let delta_uv1 = uvs[1] - uvs[0];
    let delta_uv2 = uvs[2] - uvs[0];

    let determinant = delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y;
    let scale = delta_uv1.magnitude() * delta_uv2.magnitude();
    if !determinant.is_finite() || determinant.abs() <= DEGENERATE_EPSILON * scale {
        return Err(TangentError::DegenerateUv {
            triangle,
            determinant,
        });
    }
    let f = 1.0 / determinant;

    let tangent = (edge1 * delta_uv2.y - edge2 * delta_uv1.y) * f;
    let bitangent = (edge2 * delta_uv1.x - edge1 * delta_uv2.x) * f;

    let finite = |v: Vec3<f32>| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
    if !finite(tangent) || !finite(bitangent) {
        return Err(TangentError::NonFinite { triangle });
    }

    Ok(TangentBasis { tangent, bitangent })
}

/// 计算四边形两个三角形的切线基。纯函数，每个面片调用一次。
pub fn compute_tangent_basis(patch: &QuadPatch) -> Result<QuadTangents, TangentError> {
    let [first, second] = QuadPatch::TRIANGLES.map(|indices| {
        (
            indices.map(|i| patch.positions[i]),
            indices.map(|i| patch.uvs[i]),
        )
    });

    Ok(QuadTangents {
        first: solve_triangle(first.0, first.1, 0)?,
        second: solve_triangle(second.0, second.1, 1)?,
    })
}
