pub mod clip;
pub mod fragment_shader;
pub mod lights;
pub mod post_effect;
pub mod uniforms;
pub mod vertex_shader;

use cgmath::Vector2 as Vec2;
use rayon::prelude::*;

use crate::error::RenderError;
use crate::framebuffer::{FrameBuffer, blend_over, pack_color};
use crate::rasterizer;
use crate::vertex::{ClipSpaceVertex, RasterPoint, RasterTriangle, Triangle};
use fragment_shader::{FragmentData, FragmentShader};
use uniforms::Uniforms;

use self::clip::{Clipper, NearPlaneClipper};
use self::vertex_shader::{DefaultVertexShader, VertexShader, VertexShaderUniforms};

pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Viewport {
    pub fn of(target: &FrameBuffer) -> Self {
        Self {
            x: 0,
            y: 0,
            w: target.width as i32,
            h: target.height as i32,
        }
    }
}

/// NDC 中哪种绕序算正面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back(FrontFace),
}

/// 相当于 GL 的全局开关，由调用方在绘制之间修改
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: bool,
    pub cull: CullMode,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            blend: false,
            cull: CullMode::None,
        }
    }
}

struct PreparedTriangle {
    triangle: RasterTriangle,
    bbox: (i32, i32, i32, i32),
    uv_density: f32,
}

#[derive(Default)]
pub struct Renderer {
    pub state: PipelineState,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一次绘制调用：顶点着色 -> 近平面裁剪 -> 视口变换 -> 剔除 -> 光栅化/深度/混合。
    /// model/view/projection 从 uniforms 读取。
    pub fn draw_triangles(
        &self,
        target: &mut FrameBuffer,
        triangles: &[Triangle],
        uniforms: &Uniforms,
        shader: &dyn FragmentShader,
    ) -> Result<(), RenderError> {
        let vertex_uniforms = VertexShaderUniforms::new(
            uniforms.get_mat4("model")?,
            uniforms.get_mat4("view")?,
            uniforms.get_mat4("projection")?,
        );
        let viewport = Viewport::of(target);
        let vertex_shader = DefaultVertexShader;
        let clipper = NearPlaneClipper;

        let mut prepared = Vec::with_capacity(triangles.len());
        for triangle in triangles {
            // 管线阶段 1: 顶点着色
            let clip_space_triangle = vertex_shader.shade_triangle(triangle, &vertex_uniforms);

            // 管线阶段 2: 裁剪
            for clipped in clipper.clip_triangle(&clip_space_triangle) {
                // 管线阶段 3: 屏幕映射 + 剔除
                let Some(raster) = self.viewport_transform(&clipped, &viewport) else {
                    continue;
                };
                if let CullMode::Back(_) = self.state.cull {
                    if !raster.front_facing {
                        continue;
                    }
                }
                let positions = raster.vertices.map(|p| p.pos);
                prepared.push(PreparedTriangle {
                    bbox: rasterizer::get_box(&positions),
                    uv_density: rasterizer::uv_density(&raster.vertices),
                    triangle: raster,
                });
            }
        }

        if prepared.is_empty() || target.width == 0 {
            return Ok(());
        }

        // 管线阶段 4: 按行并行光栅化，同一行内保持提交顺序（混合依赖顺序）
        let width = target.width;
        let state = self.state;
        target
            .data
            .par_chunks_mut(width)
            .zip(target.depth.par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (color_row, depth_row))| {
                let y = y as i32;
                for item in prepared.iter().filter(|t| t.bbox.1 <= y && y <= t.bbox.3) {
                    rasterize_row(item, y, color_row, depth_row, state, shader);
                }
            });

        Ok(())
    }

    //视口变换
    fn viewport_transform(
        &self,
        clip_triangle: &[ClipSpaceVertex; 3],
        viewport: &Viewport,
    ) -> Option<RasterTriangle> {
        let raster_vertices = clip_triangle.map(|clip_v| {
            let inv_w = 1.0 / clip_v.position.w;
            // 1. 透视除法
            let ndc_pos = clip_v.position * inv_w;

            // 转换到屏幕空间
            let screen_x = (ndc_pos.x + 1.0) * 0.5 * viewport.w as f32 + viewport.x as f32;
            let screen_y = viewport.h as f32 - (ndc_pos.y + 1.0) * 0.5 * viewport.h as f32
                + viewport.y as f32;

            RasterPoint {
                pos: Vec2::new(screen_x, screen_y),
                z: (ndc_pos.z + 1.0) * 0.5,
                inv_w,
                // 继承其他属性
                world_pos: clip_v.world_pos,
                normal: clip_v.normal,
                uv: clip_v.uv,
                tangent: clip_v.tangent,
                bitangent: clip_v.bitangent,
            }
        });

        let area = rasterizer::signed_area(&raster_vertices.map(|p| p.pos));
        if area == 0.0 || !area.is_finite() {
            return None;
        }
        // 屏幕 y 向下，NDC 逆时针在屏幕上面积为负
        let ndc_ccw = area < 0.0;
        let front_facing = match self.state.cull {
            CullMode::Back(FrontFace::Cw) => !ndc_ccw,
            CullMode::Back(FrontFace::Ccw) | CullMode::None => ndc_ccw,
        };

        Some(RasterTriangle {
            vertices: raster_vertices,
            front_facing,
        })
    }
}

fn rasterize_row(
    item: &PreparedTriangle,
    y: i32,
    color_row: &mut [u32],
    depth_row: &mut [f32],
    state: PipelineState,
    shader: &dyn FragmentShader,
) {
    let points = &item.triangle.vertices;
    let positions = points.map(|p| p.pos);
    let min_x = item.bbox.0.max(0);
    let max_x = item.bbox.2.min(color_row.len() as i32 - 1);

    for x in min_x..=max_x {
        let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        if !rasterizer::is_inside_triangle(&positions, &p) {
            continue;
        }
        let Some(bary) = rasterizer::get_barycentric_coords(&positions, &p) else {
            continue;
        };

        let x = x as usize;
        let depth = rasterizer::interpolate_depth(points, bary);
        if state.depth_test && !(depth < depth_row[x]) {
            continue;
        }

        // 插值所有属性
        let weights = rasterizer::perspective_weights(points, bary);
        let fragment_data = FragmentData {
            world_pos: rasterizer::interpolate_vec3(points.map(|v| v.world_pos), weights),
            normal: rasterizer::interpolate_vec3(points.map(|v| v.normal), weights),
            uv: rasterizer::interpolate_vec2(points.map(|v| v.uv), weights),
            tangent: rasterizer::interpolate_vec3(points.map(|v| v.tangent), weights),
            bitangent: rasterizer::interpolate_vec3(points.map(|v| v.bitangent), weights),
            uv_density: item.uv_density,
        };

        // 调用 shader 来获取颜色，丢弃的片元不写任何缓冲
        let Some(color) = shader.shade(&fragment_data) else {
            continue;
        };

        color_row[x] = if state.blend {
            blend_over(color, color_row[x])
        } else {
            pack_color(color)
        };
        if state.depth_test && state.depth_write {
            depth_row[x] = depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::Vertex;
    use cgmath::{Matrix4 as Mat4, SquareMatrix, Vector4 as Vec4};
    use fragment_shader::testing::FlatColorShader;

    const RED: Vec4<f32> = Vec4 { x: 1.0, y: 0.0, z: 0.0, w: 1.0 };
    const BLUE: Vec4<f32> = Vec4 { x: 0.0, y: 0.0, z: 1.0, w: 1.0 };

    fn identity_uniforms() -> Uniforms {
        let mut uniforms = Uniforms::new();
        uniforms.set_mat4("model", Mat4::identity());
        uniforms.set_mat4("view", Mat4::identity());
        uniforms.set_mat4("projection", Mat4::identity());
        uniforms
    }

    // NDC 中逆时针、覆盖中心的三角形
    fn ccw_triangle(z: f32) -> Triangle {
        Triangle::new(
            Vertex::new([-0.9, -0.9, z], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([0.9, -0.9, z], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 0.9, z], [0.0, 0.0, 1.0], [0.5, 1.0]),
        )
    }

    fn draw(renderer: &Renderer, target: &mut FrameBuffer, tri: Triangle, color: Vec4<f32>) {
        renderer
            .draw_triangles(target, &[tri], &identity_uniforms(), &FlatColorShader { color })
            .unwrap();
    }

    #[test]
    fn covered_pixels_get_color_and_depth() {
        let mut target = FrameBuffer::new(16, 16);
        draw(&Renderer::new(), &mut target, ccw_triangle(0.0), RED);

        assert_eq!(target.get_pixel(8, 8), 0xFFFF0000);
        assert!((target.depth[8 * 16 + 8] - 0.5).abs() < 1e-6);
        // 角落没有被覆盖
        assert_eq!(target.get_pixel(0, 0), 0xFF000000);
        assert_eq!(target.depth[0], 1.0);
    }

    #[test]
    fn depth_test_keeps_nearest_regardless_of_order() {
        let renderer = Renderer::new();
        let mut a = FrameBuffer::new(16, 16);
        draw(&renderer, &mut a, ccw_triangle(0.5), BLUE);
        draw(&renderer, &mut a, ccw_triangle(-0.5), RED);

        let mut b = FrameBuffer::new(16, 16);
        draw(&renderer, &mut b, ccw_triangle(-0.5), RED);
        draw(&renderer, &mut b, ccw_triangle(0.5), BLUE);

        assert_eq!(a.get_pixel(8, 8), 0xFFFF0000);
        assert_eq!(b.get_pixel(8, 8), 0xFFFF0000);
    }

    #[test]
    fn back_faces_are_culled_per_front_face_setting() {
        let mut renderer = Renderer::new();
        renderer.state.cull = CullMode::Back(FrontFace::Cw);
        let mut target = FrameBuffer::new(16, 16);
        draw(&renderer, &mut target, ccw_triangle(0.0), RED);
        assert_eq!(target.get_pixel(8, 8), 0xFF000000);

        renderer.state.cull = CullMode::Back(FrontFace::Ccw);
        draw(&renderer, &mut target, ccw_triangle(0.0), RED);
        assert_eq!(target.get_pixel(8, 8), 0xFFFF0000);
    }

    #[test]
    fn blending_mixes_with_destination() {
        let mut renderer = Renderer::new();
        renderer.state.blend = true;
        let mut target = FrameBuffer::new(16, 16);
        draw(&renderer, &mut target, ccw_triangle(0.0), Vec4::new(1.0, 1.0, 1.0, 0.5));

        let pixel = target.get_pixel(8, 8);
        assert_eq!((pixel >> 16) & 0xFF, 128);
    }

    #[test]
    fn disabled_depth_write_leaves_depth_untouched() {
        let mut renderer = Renderer::new();
        renderer.state.depth_write = false;
        let mut target = FrameBuffer::new(16, 16);
        draw(&renderer, &mut target, ccw_triangle(0.0), RED);

        assert_eq!(target.get_pixel(8, 8), 0xFFFF0000);
        assert_eq!(target.depth[8 * 16 + 8], 1.0);
    }

    #[test]
    fn triangle_crossing_near_plane_is_clipped_not_dropped() {
        let mut target = FrameBuffer::new(16, 16);
        let tri = Triangle::new(
            Vertex::new([-0.9, -0.9, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([0.9, -0.9, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 0.9, -3.0], [0.0, 0.0, 1.0], [0.5, 1.0]),
        );
        draw(&Renderer::new(), &mut target, tri, RED);

        assert_eq!(target.get_pixel(8, 14), 0xFFFF0000);
        assert!(target.depth.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn missing_matrix_uniform_is_an_error() {
        let mut uniforms = identity_uniforms();
        uniforms.set_bool("model", true);
        let mut target = FrameBuffer::new(4, 4);
        let result = Renderer::new().draw_triangles(
            &mut target,
            &[ccw_triangle(0.0)],
            &uniforms,
            &FlatColorShader { color: RED },
        );
        assert!(matches!(result, Err(RenderError::UniformType { .. })));
    }
}
