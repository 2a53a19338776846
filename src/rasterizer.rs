use crate::vertex::RasterPoint;
use cgmath::{Vector2 as Vec2, Vector3 as Vec3};

/// 边函数：p 在 a->b 左侧（屏幕坐标 y 向下时为右侧）为正
pub fn edge_function(a: Vec2<f32>, b: Vec2<f32>, p: Vec2<f32>) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// 屏幕空间有向面积的两倍。屏幕 y 向下，NDC 中逆时针的三角形在这里为负。
pub fn signed_area(vertices: &[Vec2<f32>; 3]) -> f32 {
    edge_function(vertices[0], vertices[1], vertices[2])
}

/// 重心坐标 (u, v, w) 依次对应 vertices[0], vertices[1], vertices[2]
pub fn get_barycentric_coords(
    vertices: &[Vec2<f32>; 3],
    p: &Vec2<f32>,
) -> Option<(f32, f32, f32)> {
    let area = signed_area(vertices);
    if area.abs() < 1e-8 {
        return None; // 三角形面积为零，无法计算重心坐标
    }

    let u = edge_function(vertices[1], vertices[2], *p) / area;
    let v = edge_function(vertices[2], vertices[0], *p) / area;
    let w = 1.0 - u - v;

    Some((u, v, w))
}

// 落在边上的像素只归一侧三角形，共享边不会被画两次（混合时尤其重要）。
// 相邻三角形沿相反方向经过共享边，所以恰好有一方满足条件。
fn owns_edge(a: Vec2<f32>, b: Vec2<f32>, orientation: f32) -> bool {
    let d = (b - a) * orientation;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

pub fn is_inside_triangle(vertices: &[Vec2<f32>; 3], p: &Vec2<f32>) -> bool {
    let area = signed_area(vertices);
    if area == 0.0 {
        return false;
    }
    let orientation = area.signum();

    (0..3).all(|i| {
        let a = vertices[(i + 1) % 3];
        let b = vertices[(i + 2) % 3];
        let e = edge_function(a, b, *p) * orientation;
        e > 0.0 || (e == 0.0 && owns_edge(a, b, orientation))
    })
}

pub fn get_box(vertices: &[Vec2<f32>; 3]) -> (i32, i32, i32, i32) {
    let mut min_x = vertices[0].x;
    let mut max_x = vertices[0].x;
    let mut min_y = vertices[0].y;
    let mut max_y = vertices[0].y;

    for v in vertices.iter().skip(1) {
        min_x = min_x.min(v.x);
        max_x = max_x.max(v.x);
        min_y = min_y.min(v.y);
        max_y = max_y.max(v.y);
    }

    (
        min_x.floor() as i32,
        min_y.floor() as i32,
        max_x.ceil() as i32,
        max_y.ceil() as i32,
    )
}

/// 深度在屏幕空间线性，直接用屏幕重心坐标
pub fn interpolate_depth(points: &[RasterPoint; 3], bary: (f32, f32, f32)) -> f32 {
    let (u, v, w) = bary;
    points[0].z * u + points[1].z * v + points[2].z * w
}

/// 屏幕重心坐标转为透视校正后的权重
pub fn perspective_weights(points: &[RasterPoint; 3], bary: (f32, f32, f32)) -> (f32, f32, f32) {
    let (u, v, w) = bary;
    let (a, b, c) = (
        u * points[0].inv_w,
        v * points[1].inv_w,
        w * points[2].inv_w,
    );
    let sum = a + b + c;
    if sum.abs() < f32::EPSILON {
        return bary;
    }
    (a / sum, b / sum, c / sum)
}

pub fn interpolate_vec3(values: [Vec3<f32>; 3], weights: (f32, f32, f32)) -> Vec3<f32> {
    values[0] * weights.0 + values[1] * weights.1 + values[2] * weights.2
}

pub fn interpolate_vec2(values: [Vec2<f32>; 3], weights: (f32, f32, f32)) -> Vec2<f32> {
    values[0] * weights.0 + values[1] * weights.1 + values[2] * weights.2
}

/// 每个屏幕像素覆盖的 UV 面积，整个三角形取一个值，供 mipmap 选级
pub fn uv_density(points: &[RasterPoint; 3]) -> f32 {
    let screen = signed_area(&[points[0].pos, points[1].pos, points[2].pos]).abs();
    if screen < 1e-8 {
        return 0.0;
    }
    let uv = edge_function(points[0].uv, points[1].uv, points[2].uv).abs();
    uv / screen
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Zero;

    fn point(x: f32, y: f32, z: f32, inv_w: f32) -> RasterPoint {
        RasterPoint {
            pos: Vec2::new(x, y),
            z,
            inv_w,
            world_pos: Vec3::zero(),
            normal: Vec3::zero(),
            uv: Vec2::new(x / 10.0, y / 10.0),
            tangent: Vec3::zero(),
            bitangent: Vec3::zero(),
        }
    }

    #[test]
    fn barycentric_weights_follow_vertex_order() {
        let tri = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)];

        let (u, v, w) = get_barycentric_coords(&tri, &tri[1]).unwrap();
        assert!((u - 0.0).abs() < 1e-6 && (v - 1.0).abs() < 1e-6 && w.abs() < 1e-6);

        let (u, v, w) = get_barycentric_coords(&tri, &Vec2::new(0.0, 5.0)).unwrap();
        assert!((u - 0.5).abs() < 1e-6 && v.abs() < 1e-6 && (w - 0.5).abs() < 1e-6);

        let degenerate = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)];
        assert!(get_barycentric_coords(&degenerate, &Vec2::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn shared_edge_pixels_belong_to_exactly_one_triangle() {
        // 正方形沿对角线拆成两个三角形，像素中心恰好落在对角线上
        let a = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(4.0, 4.0)];
        let b = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0), Vec2::new(0.0, 4.0)];

        for y in 0..8 {
            for x in 0..8 {
                let p = Vec2::new(x as f32 * 0.5 + 0.25, y as f32 * 0.5 + 0.25);
                let hits = is_inside_triangle(&a, &p) as u32 + is_inside_triangle(&b, &p) as u32;
                assert_eq!(hits, 1, "{p:?}");
            }
        }
    }

    #[test]
    fn winding_does_not_change_coverage() {
        let ccw = [Vec2::new(1.0, 1.0), Vec2::new(6.0, 1.0), Vec2::new(1.0, 6.0)];
        let cw = [ccw[0], ccw[2], ccw[1]];
        let p = Vec2::new(2.5, 2.5);

        assert!(is_inside_triangle(&ccw, &p));
        assert!(is_inside_triangle(&cw, &p));
        assert!(!is_inside_triangle(&cw, &Vec2::new(5.5, 5.5)));
        assert!(signed_area(&ccw) * signed_area(&cw) < 0.0);
    }

    #[test]
    fn perspective_weights_favor_nearer_vertex() {
        // 近处顶点 1/w 大，屏幕中点处的属性更偏向它
        let points = [
            point(0.0, 0.0, 0.1, 1.0),
            point(10.0, 0.0, 0.9, 0.1),
            point(0.0, 10.0, 0.5, 0.5),
        ];
        let (a, b, c) = perspective_weights(&points, (0.5, 0.5, 0.0));

        assert!((a + b + c - 1.0).abs() < 1e-6);
        assert!(a > 0.9);
        assert!((interpolate_depth(&points, (0.5, 0.5, 0.0)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn uv_density_is_uv_area_over_screen_area() {
        let points = [
            point(0.0, 0.0, 0.0, 1.0),
            point(10.0, 0.0, 0.0, 1.0),
            point(0.0, 10.0, 0.0, 1.0),
        ];
        assert!((uv_density(&points) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn box_is_rounded_outward() {
        let tri = [Vec2::new(0.2, 1.7), Vec2::new(3.5, 0.4), Vec2::new(2.0, 4.1)];
        assert_eq!(get_box(&tri), (0, 0, 4, 5));
    }
}
