use crate::vertex::ClipSpaceVertex;

pub trait Clipper {
    // 接收一个裁剪空间的三角形
    // 返回一个 Vec，其中包含裁剪后产生的零个、一个或多个三角形
    fn clip_triangle(&self, triangle: &[ClipSpaceVertex; 3]) -> Vec<[ClipSpaceVertex; 3]>;
}

/// 只对近平面 (z >= -w) 做 Sutherland-Hodgman 裁剪。
/// 其余平面交给光栅化的包围盒截断和深度测试。
pub struct NearPlaneClipper;

fn distance(v: &ClipSpaceVertex) -> f32 {
    v.position.z + v.position.w
}

fn lerp_vertex(a: &ClipSpaceVertex, b: &ClipSpaceVertex, t: f32) -> ClipSpaceVertex {
    ClipSpaceVertex {
        position: a.position + (b.position - a.position) * t,
        world_pos: a.world_pos + (b.world_pos - a.world_pos) * t,
        normal: a.normal + (b.normal - a.normal) * t,
        uv: a.uv + (b.uv - a.uv) * t,
        tangent: a.tangent + (b.tangent - a.tangent) * t,
        bitangent: a.bitangent + (b.bitangent - a.bitangent) * t,
    }
}

impl Clipper for NearPlaneClipper {
    fn clip_triangle(&self, triangle: &[ClipSpaceVertex; 3]) -> Vec<[ClipSpaceVertex; 3]> {
        let d = triangle.map(|v| distance(&v));
        if d.iter().all(|&d| d >= 0.0) {
            return vec![*triangle];
        }
        if d.iter().all(|&d| d < 0.0) {
            return vec![];
        }

        let mut polygon: Vec<ClipSpaceVertex> = Vec::with_capacity(4);
        for i in 0..3 {
            let j = (i + 1) % 3;
            let (cur, next) = (&triangle[i], &triangle[j]);
            if d[i] >= 0.0 {
                polygon.push(*cur);
            }
            // 边跨过平面时插入交点
            if (d[i] >= 0.0) != (d[j] >= 0.0) {
                let t = d[i] / (d[i] - d[j]);
                polygon.push(lerp_vertex(cur, next, t));
            }
        }

        // 凸多边形按扇形拆回三角形，绕序不变
        (1..polygon.len().saturating_sub(1))
            .map(|k| [polygon[0], polygon[k], polygon[k + 1]])
            .collect()
    }
}
