use cgmath::{InnerSpace, Vector2 as Vec2, Vector3 as Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RenderError;
use crate::framebuffer::FrameBuffer;
use crate::renderer::Renderer;
use crate::renderer::fragment_shader::FragmentShader;
use crate::renderer::uniforms::Uniforms;
use crate::tangent::compute_triangle_tangent;
use crate::texture::Texture;
use crate::vertex::{Triangle, Vertex};

/// 一个网格的材质贴图，未声明的贴图为 None
#[derive(Debug, Clone, Default)]
pub struct MeshTextures {
    pub diffuse: Option<Arc<Texture>>,
    pub specular: Option<Arc<Texture>>,
    pub normal: Option<Arc<Texture>>,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
    pub textures: MeshTextures,
}

#[derive(Debug, Clone)]
pub struct Model {
    meshes: Vec<Mesh>,
    texture_name_prefix: String,
}

// 材质贴图按路径去重，多个网格共用一份
struct TextureCache {
    dir: PathBuf,
    loaded: HashMap<PathBuf, Arc<Texture>>,
}

impl TextureCache {
    fn get(&mut self, name: &Option<String>) -> Option<Arc<Texture>> {
        let name = name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        let path = self.dir.join(name);
        let texture = self
            .loaded
            .entry(path)
            .or_insert_with_key(|path| Arc::new(Texture::load_or_placeholder(path)));
        Some(Arc::clone(texture))
    }
}

/// 任取一个与法线垂直的切线，UV 退化的面用
fn fallback_tangent(normal: Vec3<f32>) -> (Vec3<f32>, Vec3<f32>) {
    let axis = if normal.x.abs() < 0.9 {
        Vec3::unit_x()
    } else {
        Vec3::unit_y()
    };
    let tangent = (axis - normal * normal.dot(axis)).normalize();
    (tangent, normal.cross(tangent))
}

fn build_triangles(mesh: &tobj::Mesh) -> (Vec<Triangle>, usize) {
    let position = |i: usize| {
        Vec3::new(
            mesh.positions[3 * i],
            mesh.positions[3 * i + 1],
            mesh.positions[3 * i + 2],
        )
    };
    // OBJ 的 v 从下往上，纹理第 0 行在上，所以翻转
    let uv = |i: usize| {
        if mesh.texcoords.len() >= 2 * (i + 1) {
            Vec2::new(mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1])
        } else {
            Vec2::new(0.0, 0.0)
        }
    };
    let normal = |i: usize| {
        (mesh.normals.len() >= 3 * (i + 1)).then(|| {
            Vec3::new(
                mesh.normals[3 * i],
                mesh.normals[3 * i + 1],
                mesh.normals[3 * i + 2],
            )
        })
    };

    let mut degenerate = 0;
    let triangles = mesh
        .indices
        .chunks_exact(3)
        .filter_map(|face| {
            let idx = [face[0] as usize, face[1] as usize, face[2] as usize];
            let positions = idx.map(position);
            let uvs = idx.map(uv);

            let face_normal = (positions[1] - positions[0]).cross(positions[2] - positions[0]);
            if face_normal.magnitude2() == 0.0 {
                return None;
            }
            let face_normal = face_normal.normalize();

            let (tangent, bitangent) = match compute_triangle_tangent(positions, uvs) {
                Ok(basis) => (basis.tangent, basis.bitangent),
                Err(_) => {
                    degenerate += 1;
                    fallback_tangent(face_normal)
                }
            };

            let vertices = [0, 1, 2].map(|k| Vertex {
                pos: positions[k],
                normal: normal(idx[k]).unwrap_or(face_normal),
                uv: uvs[k],
                tangent,
                bitangent,
            });
            Some(Triangle { vertices })
        })
        .collect();

    (triangles, degenerate)
}

impl Model {
    /// 读取 OBJ 及其材质。材质库缺失只打印警告，贴图相对 OBJ 所在目录解析。
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;
        let materials = materials.unwrap_or_else(|err| {
            log::warn!("材质库读取失败: {} ({err})", path.display());
            Vec::new()
        });

        let mut cache = TextureCache {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            loaded: HashMap::new(),
        };

        let mut meshes = Vec::with_capacity(models.len());
        for model in &models {
            let (triangles, degenerate) = build_triangles(&model.mesh);
            if degenerate > 0 {
                log::debug!("网格 {} 有 {degenerate} 个面 UV 退化，使用替代切线", model.name);
            }

            let textures = match model.mesh.material_id.and_then(|id| materials.get(id)) {
                Some(material) => MeshTextures {
                    diffuse: cache.get(&material.diffuse_texture),
                    specular: cache.get(&material.specular_texture),
                    normal: cache.get(&material.normal_texture),
                },
                None => MeshTextures::default(),
            };

            meshes.push(Mesh {
                name: model.name.clone(),
                triangles,
                textures,
            });
        }

        let model = Self {
            meshes,
            texture_name_prefix: String::new(),
        };
        log::info!(
            "模型 {} 加载完成: {} 个网格, {} 个三角形, {} 张贴图",
            path.display(),
            model.meshes.len(),
            model.triangle_count(),
            cache.loaded.len()
        );
        Ok(model)
    }

    /// 贴图绑定名的前缀，例如 "material." 得到 "material.texture_diffuse1"
    pub fn set_texture_name_prefix(&mut self, prefix: &str) {
        self.texture_name_prefix = prefix.to_string();
    }

    #[cfg(test)]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }

    /// 逐网格绑定贴图后绘制。调用方需已设置 model/view/projection，
    /// 着色器在绑定之后由 `shader_for` 从 uniforms 构造。
    pub fn draw<S, F>(
        &self,
        renderer: &Renderer,
        target: &mut FrameBuffer,
        uniforms: &mut Uniforms,
        shader_for: F,
    ) -> Result<(), RenderError>
    where
        S: FragmentShader,
        F: Fn(&Uniforms) -> Result<S, RenderError>,
    {
        let prefix = &self.texture_name_prefix;
        for mesh in &self.meshes {
            let bindings = [
                ("texture_diffuse1", &mesh.textures.diffuse),
                ("texture_specular1", &mesh.textures.specular),
                ("texture_normal1", &mesh.textures.normal),
            ];
            for (name, texture) in bindings {
                let name = format!("{prefix}{name}");
                match texture {
                    Some(texture) => uniforms.bind_texture(&name, Arc::clone(texture)),
                    // 没有漫反射贴图时也要保证可采样
                    None if name.ends_with("diffuse1") => {
                        uniforms.bind_texture(&name, Arc::new(Texture::placeholder()))
                    }
                    None => uniforms.unbind_texture(&name),
                }
            }

            log::trace!("绘制网格 {} ({} 个三角形)", mesh.name, mesh.triangles.len());
            let shader = shader_for(uniforms)?;
            renderer.draw_triangles(target, &mesh.triangles, uniforms, &shader)?;
        }
        Ok(())
    }
}
