use cgmath::{Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4, Zero};

use crate::tangent::{QuadPatch, QuadTangents};

/// 模型空间顶点，带切线框架（法线贴图用）
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
    pub tangent: Vec3<f32>,
    pub bitangent: Vec3<f32>,
}

/// 裁剪空间顶点（顶点着色器输出）
#[derive(Debug, Clone, Copy)]
pub struct ClipSpaceVertex {
    pub position: Vec4<f32>,
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
    pub tangent: Vec3<f32>,
    pub bitangent: Vec3<f32>,
}

/// 光栅化阶段的屏幕空间点
#[derive(Debug, Clone, Copy)]
pub struct RasterPoint {
    pub pos: Vec2<f32>,
    pub z: f32,
    // 1/w，用于透视校正插值
    pub inv_w: f32,
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
    pub tangent: Vec3<f32>,
    pub bitangent: Vec3<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterTriangle {
    pub vertices: [RasterPoint; 3],
    pub front_facing: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            pos: Vec3::zero(),
            normal: Vec3::new(0.0, 1.0, 0.0),
            uv: Vec2::zero(),
            tangent: Vec3::zero(),
            bitangent: Vec3::zero(),
        }
    }
}

impl Vertex {
    /// 不需要切线的顶点（立方体、贴花）
    pub fn new(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            pos: pos.into(),
            normal: normal.into(),
            uv: uv.into(),
            ..Default::default()
        }
    }
}

/// 把面片和它的切线基拼成两个三角形，每个三角形共用自己的切线基
pub fn quad_to_triangles(patch: &QuadPatch, tangents: &QuadTangents) -> [Triangle; 2] {
    let bases = [tangents.first, tangents.second];

    [0, 1].map(|t| {
        let basis = bases[t];
        let vertex = |i: usize| Vertex {
            pos: patch.positions[i],
            normal: patch.normal,
            uv: patch.uvs[i],
            tangent: basis.tangent,
            bitangent: basis.bitangent,
        };
        let [a, b, c] = QuadPatch::TRIANGLES[t];
        Triangle::new(vertex(a), vertex(b), vertex(c))
    })
}

/// 按每 8 个浮点数（位置、法线、UV）一组解析交错顶点数组
pub fn triangles_from_interleaved(data: &[f32]) -> Vec<Triangle> {
    data.chunks_exact(8 * 3)
        .map(|tri| {
            let vertex =
                |v: &[f32]| Vertex::new([v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7]]);
            Triangle::new(vertex(&tri[0..8]), vertex(&tri[8..16]), vertex(&tri[16..24]))
        })
        .collect()
}
