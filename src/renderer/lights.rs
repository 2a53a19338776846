use cgmath::{InnerSpace, Vector3 as Vec3};

use crate::error::RenderError;
use crate::renderer::uniforms::Uniforms;

#[derive(Debug, Clone, Copy)]
pub struct DirLight {
    pub direction: Vec3<f32>,
    pub ambient: Vec3<f32>,
    pub diffuse: Vec3<f32>,
    pub specular: Vec3<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3<f32>,
    pub ambient: Vec3<f32>,
    pub diffuse: Vec3<f32>,
    pub specular: Vec3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub position: Vec3<f32>,
    pub direction: Vec3<f32>,
    /// 内外锥角的余弦
    pub cut_off: f32,
    pub outer_cut_off: f32,
    pub ambient: Vec3<f32>,
    pub diffuse: Vec3<f32>,
    pub specular: Vec3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

/// 场景中全部光源，每帧上传一次
#[derive(Debug, Clone, Copy)]
pub struct SceneLights {
    pub dir: DirLight,
    pub point: PointLight,
    pub spot: SpotLight,
    pub spot_on: bool,
}

impl Default for DirLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            ambient: Vec3::new(0.05, 0.05, 0.05),
            diffuse: Vec3::new(0.4, 0.4, 0.4),
            specular: Vec3::new(0.5, 0.5, 0.5),
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.5, 0.0),
            ambient: Vec3::new(0.2, 0.2, 0.2),
            diffuse: Vec3::new(0.7, 0.7, 0.7),
            specular: Vec3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl PointLight {
    /// G 键切换的绿色版本，只改颜色
    pub fn green(self) -> Self {
        Self {
            ambient: Vec3::new(0.0, 0.2, 0.0),
            diffuse: Vec3::new(0.0, 0.8, 0.0),
            specular: Vec3::new(0.0, 1.0, 0.0),
            ..self
        }
    }
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 0.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            cut_off: 12.5f32.to_radians().cos(),
            outer_cut_off: 15.0f32.to_radians().cos(),
            ambient: Vec3::new(0.2, 0.2, 0.2),
            diffuse: Vec3::new(0.8, 0.8, 0.8),
            specular: Vec3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

fn attenuation(constant: f32, linear: f32, quadratic: f32, distance: f32) -> f32 {
    1.0 / (constant + linear * distance + quadratic * distance * distance)
}

impl DirLight {
    pub fn upload(&self, uniforms: &mut Uniforms) {
        uniforms.set_vec3("dirLight.direction", self.direction);
        uniforms.set_vec3("dirLight.ambient", self.ambient);
        uniforms.set_vec3("dirLight.diffuse", self.diffuse);
        uniforms.set_vec3("dirLight.specular", self.specular);
    }

    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            direction: uniforms.get_vec3("dirLight.direction")?,
            ambient: uniforms.get_vec3("dirLight.ambient")?,
            diffuse: uniforms.get_vec3("dirLight.diffuse")?,
            specular: uniforms.get_vec3("dirLight.specular")?,
        })
    }
}

impl PointLight {
    pub fn upload(&self, uniforms: &mut Uniforms) {
        uniforms.set_vec3("pointLight.position", self.position);
        uniforms.set_vec3("pointLight.ambient", self.ambient);
        uniforms.set_vec3("pointLight.diffuse", self.diffuse);
        uniforms.set_vec3("pointLight.specular", self.specular);
        uniforms.set_float("pointLight.constant", self.constant);
        uniforms.set_float("pointLight.linear", self.linear);
        uniforms.set_float("pointLight.quadratic", self.quadratic);
    }

    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            position: uniforms.get_vec3("pointLight.position")?,
            ambient: uniforms.get_vec3("pointLight.ambient")?,
            diffuse: uniforms.get_vec3("pointLight.diffuse")?,
            specular: uniforms.get_vec3("pointLight.specular")?,
            constant: uniforms.get_float("pointLight.constant")?,
            linear: uniforms.get_float("pointLight.linear")?,
            quadratic: uniforms.get_float("pointLight.quadratic")?,
        })
    }
}

impl SpotLight {
    pub fn upload(&self, uniforms: &mut Uniforms) {
        uniforms.set_vec3("spotLight.position", self.position);
        uniforms.set_vec3("spotLight.direction", self.direction);
        uniforms.set_vec3("spotLight.ambient", self.ambient);
        uniforms.set_vec3("spotLight.diffuse", self.diffuse);
        uniforms.set_vec3("spotLight.specular", self.specular);
        uniforms.set_float("spotLight.constant", self.constant);
        uniforms.set_float("spotLight.linear", self.linear);
        uniforms.set_float("spotLight.quadratic", self.quadratic);
        uniforms.set_float("spotLight.cutOff", self.cut_off);
        uniforms.set_float("spotLight.outerCutOff", self.outer_cut_off);
    }

    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            position: uniforms.get_vec3("spotLight.position")?,
            direction: uniforms.get_vec3("spotLight.direction")?,
            cut_off: uniforms.get_float("spotLight.cutOff")?,
            outer_cut_off: uniforms.get_float("spotLight.outerCutOff")?,
            ambient: uniforms.get_vec3("spotLight.ambient")?,
            diffuse: uniforms.get_vec3("spotLight.diffuse")?,
            specular: uniforms.get_vec3("spotLight.specular")?,
            constant: uniforms.get_float("spotLight.constant")?,
            linear: uniforms.get_float("spotLight.linear")?,
            quadratic: uniforms.get_float("spotLight.quadratic")?,
        })
    }
}

impl SceneLights {
    pub fn upload(&self, uniforms: &mut Uniforms) {
        self.dir.upload(uniforms);
        self.point.upload(uniforms);
        self.spot.upload(uniforms);
        uniforms.set_bool("spotLightOn", self.spot_on);
    }

    pub fn from_uniforms(uniforms: &Uniforms) -> Result<Self, RenderError> {
        Ok(Self {
            dir: DirLight::from_uniforms(uniforms)?,
            point: PointLight::from_uniforms(uniforms)?,
            spot: SpotLight::from_uniforms(uniforms)?,
            spot_on: uniforms.get_bool("spotLightOn")?,
        })
    }
}

/// 单个光源的 Blinn-Phong 贡献，颜色按各自贴图分量相乘
pub struct SurfaceSample {
    pub position: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub view_dir: Vec3<f32>,
    pub diffuse: Vec3<f32>,
    pub specular: Vec3<f32>,
    pub shininess: f32,
}

impl SurfaceSample {
    fn shade(
        &self,
        light_dir: Vec3<f32>,
        ambient: Vec3<f32>,
        diffuse: Vec3<f32>,
        specular: Vec3<f32>,
    ) -> (Vec3<f32>, Vec3<f32>, Vec3<f32>) {
        use cgmath::ElementWise;

        let diff = self.normal.dot(light_dir).max(0.0);
        let half_dir = (light_dir + self.view_dir).normalize();
        let spec = if diff > 0.0 {
            self.normal.dot(half_dir).max(0.0).powf(self.shininess)
        } else {
            0.0
        };

        (
            ambient.mul_element_wise(self.diffuse),
            diffuse.mul_element_wise(self.diffuse) * diff,
            specular.mul_element_wise(self.specular) * spec,
        )
    }
}

impl SceneLights {
    pub fn shade(&self, surface: &SurfaceSample) -> Vec3<f32> {
        let mut color = {
            let (a, d, s) = surface.shade(
                (-self.dir.direction).normalize(),
                self.dir.ambient,
                self.dir.diffuse,
                self.dir.specular,
            );
            a + d + s
        };

        {
            let p = &self.point;
            let to_light = p.position - surface.position;
            let att = attenuation(p.constant, p.linear, p.quadratic, to_light.magnitude());
            let (a, d, s) = surface.shade(to_light.normalize(), p.ambient, p.diffuse, p.specular);
            color += (a + d + s) * att;
        }

        if self.spot_on {
            let sp = &self.spot;
            let to_light = sp.position - surface.position;
            let light_dir = to_light.normalize();
            let theta = light_dir.dot((-sp.direction).normalize());
            let epsilon = sp.cut_off - sp.outer_cut_off;
            let intensity = ((theta - sp.outer_cut_off) / epsilon).clamp(0.0, 1.0);
            let att = attenuation(sp.constant, sp.linear, sp.quadratic, to_light.magnitude());
            let (a, d, s) = surface.shade(light_dir, sp.ambient, sp.diffuse, sp.specular);
            color += (a + (d + s) * intensity) * att;
        }

        color
    }
}
