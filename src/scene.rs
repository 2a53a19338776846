use cgmath::{
    Deg, InnerSpace, Matrix4 as Mat4, SquareMatrix, Vector2 as Vec2, Vector3 as Vec3,
    Vector4 as Vec4,
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{AssetConfig, TransparentOrder};
use crate::error::RenderError;
use crate::framebuffer::FrameBuffer;
use crate::input::AppState;
use crate::model::Model;
use crate::renderer::fragment_shader::{LightingShader, MaterialMaps, NormalMappingShader};
use crate::renderer::lights::{DirLight, PointLight, SceneLights, SpotLight};
use crate::renderer::uniforms::Uniforms;
use crate::renderer::{CullMode, FrontFace, Renderer};
use crate::tangent::{QuadPatch, compute_tangent_basis};
use crate::texture::Texture;
use crate::vertex::{Triangle, quad_to_triangles, triangles_from_interleaved};

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
const SHININESS: f32 = 32.0;

// 位置(3) 法线(3) UV(2)，正面为顺时针
#[rustfmt::skip]
const CUBE_VERTICES: [f32; 288] = [
    // 后
    -0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 0.0,
     0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 0.0,
     0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 1.0,
     0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 1.0,
    -0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 1.0,
    -0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 0.0,
    // 前
    -0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 0.0,
     0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 1.0,
     0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 0.0,
     0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 1.0,
    -0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 0.0,
    -0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 1.0,
    // 左
    -0.5,  0.5,  0.5, -1.0,  0.0,  0.0,  1.0, 0.0,
    -0.5, -0.5, -0.5, -1.0,  0.0,  0.0,  0.0, 1.0,
    -0.5,  0.5, -0.5, -1.0,  0.0,  0.0,  1.0, 1.0,
    -0.5, -0.5, -0.5, -1.0,  0.0,  0.0,  0.0, 1.0,
    -0.5,  0.5,  0.5, -1.0,  0.0,  0.0,  1.0, 0.0,
    -0.5, -0.5,  0.5, -1.0,  0.0,  0.0,  0.0, 0.0,
    // 右
     0.5,  0.5,  0.5,  1.0,  0.0,  0.0,  1.0, 0.0,
     0.5,  0.5, -0.5,  1.0,  0.0,  0.0,  1.0, 1.0,
     0.5, -0.5, -0.5,  1.0,  0.0,  0.0,  0.0, 1.0,
     0.5, -0.5, -0.5,  1.0,  0.0,  0.0,  0.0, 1.0,
     0.5, -0.5,  0.5,  1.0,  0.0,  0.0,  0.0, 0.0,
     0.5,  0.5,  0.5,  1.0,  0.0,  0.0,  1.0, 0.0,
    // 下
    -0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  0.0, 1.0,
     0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  1.0, 0.0,
     0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  1.0, 1.0,
     0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  1.0, 0.0,
    -0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  0.0, 1.0,
    -0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  0.0, 0.0,
    // 上
    -0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  0.0, 1.0,
     0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  1.0, 1.0,
     0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  1.0, 0.0,
     0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  1.0, 0.0,
    -0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  0.0, 0.0,
    -0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  0.0, 1.0,
];

// 贴花：从原点向 +x 展开的 1x1 竖直面片
#[rustfmt::skip]
const DECAL_VERTICES: [f32; 48] = [
    0.0,  0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 0.0,
    0.0, -0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 1.0,
    1.0, -0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 1.0,
    0.0,  0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 0.0,
    1.0, -0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 1.0,
    1.0,  0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0,
];

const CUBE_POSITIONS: [[f32; 3]; 2] = [[-2.0, 0.0, -1.5], [2.0, 0.0, -1.5]];
const CUBE_SCALE: f32 = 1.3;
const DECAL_POSITIONS: [[f32; 3]; 2] = [[1.54, 0.1, -0.83], [-2.44, 0.1, -0.83]];
const DECAL_SCALE: f32 = 0.9;
// 左墙绕 Y 轴旋转得到四面墙
const WALL_ROTATIONS: [f32; 4] = [0.0, 180.0, 90.0, 270.0];

/// 左墙 x = -5，UV 按砖块比例重复
pub fn left_wall_patch() -> QuadPatch {
    QuadPatch::new(
        [
            Vec3::new(-5.0, 5.0, 5.0),
            Vec3::new(-5.0, -0.5, 5.0),
            Vec3::new(-5.0, -0.5, -5.0),
            Vec3::new(-5.0, 5.0, -5.0),
        ],
        [
            Vec2::new(0.0, 5.5),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 5.5),
        ],
        Vec3::new(1.0, 0.0, 0.0),
    )
}

/// 地板 y = -0.5，天花板复用它
pub fn floor_patch() -> QuadPatch {
    QuadPatch::new(
        [
            Vec3::new(-5.0, -0.5, -5.0),
            Vec3::new(-5.0, -0.5, 5.0),
            Vec3::new(5.0, -0.5, 5.0),
            Vec3::new(5.0, -0.5, -5.0),
        ],
        [
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
        ],
        Vec3::new(0.0, 1.0, 0.0),
    )
}

fn ceiling_matrix() -> Mat4<f32> {
    Mat4::from_translation(Vec3::new(0.0, 4.5, 0.0)) * Mat4::from_angle_x(Deg(180.0))
}

fn barrel_matrix() -> Mat4<f32> {
    Mat4::from_translation(Vec3::new(0.0, 0.25, -3.0))
        * Mat4::from_angle_y(Deg(172.0))
        * Mat4::from_nonuniform_scale(0.2, 0.25, 0.2)
}

/// 贴花的模型矩阵，按给定顺序排列
pub fn decal_matrices(order: TransparentOrder, eye: Vec3<f32>) -> Vec<Mat4<f32>> {
    let mut decals: Vec<Mat4<f32>> = DECAL_POSITIONS
        .iter()
        .map(|&p| Mat4::from_translation(p.into()) * Mat4::from_scale(DECAL_SCALE))
        .collect();

    if order == TransparentOrder::BackToFront {
        // 面片中心在局部 (0.5, 0, 0)
        let distance = |m: &Mat4<f32>| {
            let center = (*m * Vec4::new(0.5, 0.0, 0.0, 1.0)).truncate();
            (center - eye).magnitude2()
        };
        decals.sort_by(|a, b| distance(b).total_cmp(&distance(a)));
    }
    decals
}

/// 当帧的光源：点光源颜色随开关变化，手电筒跟随相机
pub fn scene_lights(state: &AppState) -> SceneLights {
    let point = PointLight::default();
    SceneLights {
        dir: DirLight::default(),
        point: if state.green_light { point.green() } else { point },
        spot: SpotLight {
            position: state.camera_position(),
            direction: state.camera.front,
            ..SpotLight::default()
        },
        spot_on: state.spot_light_on,
    }
}

/// 一个表面用到的贴图
#[derive(Debug, Clone)]
struct SurfaceMaps {
    diffuse: Arc<Texture>,
    specular: Arc<Texture>,
    normal: Option<Arc<Texture>>,
}

impl SurfaceMaps {
    fn load(dir: &Path, diffuse: &str, specular: &str, normal: Option<&str>) -> Self {
        let load = |name: &str| Arc::new(Texture::load_or_placeholder(&dir.join(name)));
        Self {
            diffuse: load(diffuse),
            specular: load(specular),
            normal: normal.map(load),
        }
    }

    fn bind(&self, uniforms: &mut Uniforms) {
        uniforms.bind_texture(MaterialMaps::DIFFUSE, Arc::clone(&self.diffuse));
        uniforms.bind_texture(MaterialMaps::SPECULAR, Arc::clone(&self.specular));
        match &self.normal {
            Some(normal) => uniforms.bind_texture(MaterialMaps::NORMAL, Arc::clone(normal)),
            None => uniforms.unbind_texture(MaterialMaps::NORMAL),
        }
    }
}

/// 房间用到的全部贴图和模型。读取失败的贴图用替代纹理，模型读取失败则不画。
pub struct RoomAssets {
    cube: SurfaceMaps,
    decal: SurfaceMaps,
    wall: SurfaceMaps,
    floor: SurfaceMaps,
    ceiling: SurfaceMaps,
    model: Option<Model>,
}

impl RoomAssets {
    pub fn load(config: &AssetConfig) -> Self {
        let dir = config.texture_dir.as_path();
        let model = match Model::load(&config.model_path) {
            Ok(mut model) => {
                model.set_texture_name_prefix("material.");
                Some(model)
            }
            Err(err) => {
                log::error!("模型 {} 读取失败，跳过: {err}", config.model_path.display());
                None
            }
        };

        Self {
            cube: SurfaceMaps::load(dir, "rust_diffuse.jpg", "rust_specular.jpg", None),
            decal: SurfaceMaps::load(dir, "caution_diffuse.png", "caution_specular.png", None),
            wall: SurfaceMaps::load(dir, "BRICKS.jpg", "BRICKS_SPEC.jpg", Some("BRICKS_NORM.jpg")),
            floor: SurfaceMaps::load(
                dir,
                "concrete_wall.jpg",
                "concrete_wall_specular.jpg",
                Some("concrete_wall_normal.jpg"),
            ),
            ceiling: SurfaceMaps::load(
                dir,
                "ceiling_diffuse.jpg",
                "ceiling_specular.jpg",
                Some("ceiling_normal.jpg"),
            ),
            model,
        }
    }
}

pub struct RoomScene {
    assets: RoomAssets,
    cube: Vec<Triangle>,
    decal: Vec<Triangle>,
    wall: [Triangle; 2],
    floor: [Triangle; 2],
    transparent_order: TransparentOrder,
}

impl RoomScene {
    /// 组装几何体。墙和地板的切线基只在这里算一次。
    pub fn build(
        assets: RoomAssets,
        transparent_order: TransparentOrder,
    ) -> Result<Self, RenderError> {
        let wall_patch = left_wall_patch();
        let wall = quad_to_triangles(&wall_patch, &compute_tangent_basis(&wall_patch)?);
        let floor_patch = floor_patch();
        let floor = quad_to_triangles(&floor_patch, &compute_tangent_basis(&floor_patch)?);

        let scene = Self {
            assets,
            cube: triangles_from_interleaved(&CUBE_VERTICES),
            decal: triangles_from_interleaved(&DECAL_VERTICES),
            wall,
            floor,
            transparent_order,
        };
        log::info!(
            "场景就绪: 模型{}，半透明排序 {:?}",
            if scene.assets.model.is_some() { "已加载" } else { "缺失" },
            scene.transparent_order
        );
        Ok(scene)
    }

    /// 把整个房间画进离屏目标。调用方负责清屏，管线状态在返回前复原。
    pub fn render(
        &self,
        renderer: &mut Renderer,
        target: &mut FrameBuffer,
        state: &AppState,
        uniforms: &mut Uniforms,
    ) -> Result<(), RenderError> {
        let camera = &state.camera;
        let aspect = target.width as f32 / target.height.max(1) as f32;

        scene_lights(state).upload(uniforms);
        uniforms.set_float("material.shininess", SHININESS);
        uniforms.set_vec3("viewPosition", camera.position);
        uniforms.set_vec3("viewPos", camera.position);
        uniforms.set_mat4("view", camera.get_view_mat());
        uniforms.set_mat4(
            "projection",
            *camera.get_frustum(aspect, NEAR_PLANE, FAR_PLANE).get_mat(),
        );
        uniforms.set_bool("blending", false);

        // 立方体
        renderer.state.cull = CullMode::Back(FrontFace::Cw);
        self.assets.cube.bind(uniforms);
        let shader = LightingShader::from_uniforms(uniforms)?;
        for position in CUBE_POSITIONS {
            uniforms.set_mat4(
                "model",
                Mat4::from_translation(position.into()) * Mat4::from_scale(CUBE_SCALE),
            );
            renderer.draw_triangles(target, &self.cube, uniforms, &shader)?;
        }
        renderer.state.cull = CullMode::None;

        // 墙、地板、天花板两面都可见
        self.assets.wall.bind(uniforms);
        let shader = NormalMappingShader::from_uniforms(uniforms)?;
        for angle in WALL_ROTATIONS {
            uniforms.set_mat4("model", Mat4::from_angle_y(Deg(angle)));
            renderer.draw_triangles(target, &self.wall, uniforms, &shader)?;
        }

        self.assets.floor.bind(uniforms);
        uniforms.set_mat4("model", Mat4::identity());
        let shader = NormalMappingShader::from_uniforms(uniforms)?;
        renderer.draw_triangles(target, &self.floor, uniforms, &shader)?;

        self.assets.ceiling.bind(uniforms);
        uniforms.set_mat4("model", ceiling_matrix());
        let shader = NormalMappingShader::from_uniforms(uniforms)?;
        renderer.draw_triangles(target, &self.floor, uniforms, &shader)?;

        if let Some(model) = &self.assets.model {
            renderer.state.cull = CullMode::Back(FrontFace::Ccw);
            uniforms.set_mat4("model", barrel_matrix());
            let drawn = model.draw(renderer, target, uniforms, NormalMappingShader::from_uniforms);
            renderer.state.cull = CullMode::None;
            drawn?;
        }

        // 半透明贴花在所有不透明物体之后
        renderer.state.blend = true;
        uniforms.set_bool("blending", true);
        self.assets.decal.bind(uniforms);
        let shader = LightingShader::from_uniforms(uniforms)?;
        let drawn = decal_matrices(self.transparent_order, camera.position)
            .into_iter()
            .try_for_each(|model| {
                uniforms.set_mat4("model", model);
                renderer.draw_triangles(target, &self.decal, uniforms, &shader)
            });
        renderer.state.blend = false;
        uniforms.set_bool("blending", false);
        drawn
    }
}
