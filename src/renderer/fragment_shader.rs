use cgmath::{InnerSpace, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4};
use std::sync::Arc;

use crate::error::RenderError;
use crate::renderer::lights::{SceneLights, SurfaceSample};
use crate::renderer::uniforms::Uniforms;
use crate::texture::Texture;

/// 插值后的片元输入（透视校正）
#[derive(Debug, Clone, Copy)]
pub struct FragmentData {
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
    pub tangent: Vec3<f32>,
    pub bitangent: Vec3<f32>,
    // 三角形的 UV 面积 / 屏幕面积，用于选 mipmap
    pub uv_density: f32,
}

// 定义 Shader 的通用行为
pub trait FragmentShader: Sync {
    // 输出 0.0 ~ 1.0 的 RGBA；None 表示丢弃该片元
    fn shade(&self, data: &FragmentData) -> Option<Vec4<f32>>;
}

/// 材质贴图，名字固定为 material.texture_diffuse1 等
#[derive(Debug, Clone)]
pub struct MaterialMaps {
    pub diffuse: Arc<Texture>,
    pub specular: Arc<Texture>,
    pub shininess: f32,
}

impl MaterialMaps {
    pub const DIFFUSE: &'static str = "material.texture_diffuse1";
    pub const SPECULAR: &'static str = "material.texture_specular1";
    pub const NORMAL: &'static str = "material.texture_normal1";

    /// 漫反射贴图必须绑定；高光贴图缺失时当作无高光
    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            diffuse: uniforms.require_texture(Self::DIFFUSE)?,
            specular: uniforms
                .texture(Self::SPECULAR)
                .unwrap_or_else(|| Arc::new(Texture::placeholder())),
            shininess: uniforms.get_float("material.shininess")?,
        })
    }
}

fn lit_color(
    lights: &SceneLights,
    maps: &MaterialMaps,
    data: &FragmentData,
    normal: Vec3<f32>,
    view_position: Vec3<f32>,
) -> (Vec3<f32>, f32) {
    let diffuse = maps.diffuse.sample_with_density(data.uv, data.uv_density);
    let specular = maps.specular.sample_with_density(data.uv, data.uv_density);
    let surface = SurfaceSample {
        position: data.world_pos,
        normal,
        view_dir: (view_position - data.world_pos).normalize(),
        diffuse: diffuse.truncate(),
        specular: specular.truncate(),
        shininess: maps.shininess,
    };
    let color = lights.shade(&surface).map(|c| c.clamp(0.0, 1.0));
    (color, diffuse.w)
}

/// 立方体和贴花使用的光照着色器
pub struct LightingShader {
    pub maps: MaterialMaps,
    pub lights: SceneLights,
    pub view_position: Vec3<f32>,
    pub blending: bool,
}

impl LightingShader {
    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            maps: MaterialMaps::from_uniforms(uniforms)?,
            lights: SceneLights::from_uniforms(uniforms)?,
            view_position: uniforms.get_vec3("viewPosition")?,
            blending: uniforms.get_bool("blending")?,
        })
    }
}

impl FragmentShader for LightingShader {
    fn shade(&self, data: &FragmentData) -> Option<Vec4<f32>> {
        let normal = data.normal.normalize();
        let (color, alpha) = lit_color(&self.lights, &self.maps, data, normal, self.view_position);

        if self.blending {
            // 几乎透明的部分直接丢弃，不写深度
            if alpha < 0.1 {
                return None;
            }
            Some(color.extend(alpha))
        } else {
            Some(color.extend(1.0))
        }
    }
}

/// 墙、地板、天花板和模型使用的法线贴图着色器
pub struct NormalMappingShader {
    pub maps: MaterialMaps,
    pub normal_map: Option<Arc<Texture>>,
    pub lights: SceneLights,
    pub view_position: Vec3<f32>,
}

impl NormalMappingShader {
    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            maps: MaterialMaps::from_uniforms(uniforms)?,
            normal_map: uniforms.texture(MaterialMaps::NORMAL),
            lights: SceneLights::from_uniforms(uniforms)?,
            view_position: uniforms.get_vec3("viewPos")?,
        })
    }

    /// 用 TBN 把切线空间法线转到世界空间。
    /// 没有法线贴图或切线退化时返回几何法线。
    pub fn perturbed_normal(&self, data: &FragmentData) -> Vec3<f32> {
        let n = data.normal.normalize();
        let Some(normal_map) = &self.normal_map else {
            return n;
        };

        // 重新正交化，插值后 T 不一定还垂直于 N
        let t = data.tangent - n * n.dot(data.tangent);
        if t.magnitude2() < 1e-12 || data.bitangent.magnitude2() < 1e-12 {
            return n;
        }
        let t = t.normalize();
        let b = data.bitangent.normalize();

        let sample = normal_map.sample_with_density(data.uv, data.uv_density).truncate();
        let tangent_space = sample * 2.0 - Vec3::new(1.0, 1.0, 1.0);
        let world = t * tangent_space.x + b * tangent_space.y + n * tangent_space.z;
        if world.magnitude2() < 1e-12 {
            n
        } else {
            world.normalize()
        }
    }
}

impl FragmentShader for NormalMappingShader {
    fn shade(&self, data: &FragmentData) -> Option<Vec4<f32>> {
        let normal = self.perturbed_normal(data);
        let (color, _) = lit_color(&self.lights, &self.maps, data, normal, self.view_position);
        Some(color.extend(1.0))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::lights::{DirLight, PointLight, SpotLight};
    use cgmath::Zero;

    fn solid(rgba: [u8; 4]) -> Arc<Texture> {
        Arc::new(Texture::from_rgba8(1, 1, &[rgba]))
    }

    fn uniforms() -> Uniforms {
        let mut uniforms = Uniforms::new();
        SceneLights {
            dir: DirLight::default(),
            point: PointLight::default(),
            spot: SpotLight::default(),
            spot_on: false,
        }
        .upload(&mut uniforms);
        uniforms.set_float("material.shininess", 32.0);
        uniforms.set_vec3("viewPosition", Vec3::new(0.0, 1.4, 4.95));
        uniforms.set_vec3("viewPos", Vec3::new(0.0, 1.4, 4.95));
        uniforms.set_bool("blending", false);
        uniforms.bind_texture(MaterialMaps::DIFFUSE, solid([255, 255, 255, 255]));
        uniforms
    }

    fn fragment() -> FragmentData {
        FragmentData {
            world_pos: Vec3::new(0.0, -0.5, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
            uv: Vec2::new(0.5, 0.5),
            tangent: Vec3::new(1.0, 0.0, 0.0),
            bitangent: Vec3::new(0.0, 0.0, -1.0),
            uv_density: 0.0,
        }
    }

    #[test]
    fn missing_diffuse_map_is_reported() {
        let mut uniforms = uniforms();
        uniforms.unbind_texture(MaterialMaps::DIFFUSE);
        assert!(matches!(
            LightingShader::from_uniforms(&uniforms),
            Err(RenderError::MissingUniform(name)) if name == MaterialMaps::DIFFUSE
        ));
    }

    #[test]
    fn blending_discards_nearly_transparent_texels() {
        let mut uniforms = uniforms();
        uniforms.set_bool("blending", true);
        uniforms.bind_texture(MaterialMaps::DIFFUSE, solid([255, 0, 0, 10]));
        let shader = LightingShader::from_uniforms(&uniforms).unwrap();
        assert!(shader.shade(&fragment()).is_none());

        uniforms.bind_texture(MaterialMaps::DIFFUSE, solid([255, 0, 0, 128]));
        let shader = LightingShader::from_uniforms(&uniforms).unwrap();
        let color = shader.shade(&fragment()).unwrap();
        assert!((color.w - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn opaque_output_ignores_texture_alpha() {
        let mut uniforms = uniforms();
        uniforms.bind_texture(MaterialMaps::DIFFUSE, solid([255, 255, 255, 0]));
        let shader = LightingShader::from_uniforms(&uniforms).unwrap();
        assert_eq!(shader.shade(&fragment()).unwrap().w, 1.0);
    }

    #[test]
    fn flat_normal_map_keeps_geometric_normal() {
        let mut uniforms = uniforms();
        // (128, 128, 255) 对应切线空间 (0, 0, 1)
        uniforms.bind_texture(MaterialMaps::NORMAL, solid([128, 128, 255, 255]));
        let shader = NormalMappingShader::from_uniforms(&uniforms).unwrap();

        let n = shader.perturbed_normal(&fragment());
        assert!((n - Vec3::new(0.0, 1.0, 0.0)).magnitude() < 0.01);
    }

    #[test]
    fn tilted_normal_map_follows_tangent() {
        let mut uniforms = uniforms();
        // 切线空间 (1, 0, 0) 即沿切线方向
        uniforms.bind_texture(MaterialMaps::NORMAL, solid([255, 128, 128, 255]));
        let shader = NormalMappingShader::from_uniforms(&uniforms).unwrap();

        let n = shader.perturbed_normal(&fragment());
        assert!(n.x > 0.99);
    }

    #[test]
    fn missing_tangents_fall_back_to_geometric_normal() {
        let mut uniforms = uniforms();
        uniforms.bind_texture(MaterialMaps::NORMAL, solid([255, 128, 128, 255]));
        let shader = NormalMappingShader::from_uniforms(&uniforms).unwrap();
        let data = FragmentData {
            tangent: Vec3::zero(),
            bitangent: Vec3::zero(),
            ..fragment()
        };

        assert_eq!(shader.perturbed_normal(&data), Vec3::new(0.0, 1.0, 0.0));
    }
}
