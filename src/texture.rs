use cgmath::{Vector2 as Vec2, Vector4 as Vec4};
use std::path::Path;

/// 一级 mipmap，像素按 RGBA 打包为 0xRRGGBBAA
#[derive(Debug, Clone)]
struct MipLevel {
    width: usize,
    height: usize,
    data: Vec<u32>,
}

/// 重复寻址、线性放大、三线性缩小的 2D 纹理
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    levels: Vec<MipLevel>,
}

// 纹理内部布局 0xRRGGBBAA，与帧缓冲的 0xAARRGGBB 不同，不要混用
fn pack_rrggbbaa(rgba: [u8; 4]) -> u32 {
    (rgba[0] as u32) << 24 | (rgba[1] as u32) << 16 | (rgba[2] as u32) << 8 | rgba[3] as u32
}

fn unpack_rrggbbaa(color: u32) -> Vec4<f32> {
    Vec4::new(
        ((color >> 24) & 0xFF) as f32 / 255.0,
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
    )
}

impl MipLevel {
    /// 2x2 盒式滤波生成下一级，奇数边长时截断到边缘
    fn downsample(&self) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut data = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                let mut sum = [0u32; 4];
                for dy in 0..2 {
                    for dx in 0..2 {
                        let sx = (x * 2 + dx).min(self.width - 1);
                        let sy = (y * 2 + dy).min(self.height - 1);
                        let color = self.data[sy * self.width + sx];
                        sum[0] += (color >> 24) & 0xFF;
                        sum[1] += (color >> 16) & 0xFF;
                        sum[2] += (color >> 8) & 0xFF;
                        sum[3] += color & 0xFF;
                    }
                }
                data.push(pack_rrggbbaa(sum.map(|c| ((c + 2) / 4) as u8)));
            }
        }

        MipLevel {
            width,
            height,
            data,
        }
    }

    fn texel(&self, x: i64, y: i64) -> Vec4<f32> {
        // GL_REPEAT
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        unpack_rrggbbaa(self.data[y * self.width + x])
    }

    fn sample_bilinear(&self, uv: Vec2<f32>) -> Vec4<f32> {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);

        let top = self.texel(xi, yi) * (1.0 - tx) + self.texel(xi + 1, yi) * tx;
        let bottom = self.texel(xi, yi + 1) * (1.0 - tx) + self.texel(xi + 1, yi + 1) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

impl Texture {
    /// 由 RGBA8 像素构造并生成完整的 mip 链
    pub fn from_rgba8(width: usize, height: usize, pixels: &[[u8; 4]]) -> Self {
        assert_eq!(pixels.len(), width * height, "像素数量与尺寸不符");
        let mut levels = vec![MipLevel {
            width,
            height,
            data: pixels.iter().map(|&p| pack_rrggbbaa(p)).collect(),
        }];
        while let Some(last) = levels.last() {
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }

        Self {
            width,
            height,
            levels,
        }
    }

    /// 读取失败时的替代纹理：1x1 不透明黑色，对应未完成纹理的采样结果
    pub fn placeholder() -> Self {
        Self::from_rgba8(1, 1, &[[0, 0, 0, 255]])
    }

    pub fn from_file(path: &Path) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        let channels = img.color().channel_count();
        let (width, height) = (img.width() as usize, img.height() as usize);

        // 单通道图按 RED 格式上传：只有红色分量
        let pixels: Vec<[u8; 4]> = if channels == 1 {
            img.to_luma8().pixels().map(|p| [p[0], 0, 0, 255]).collect()
        } else {
            img.to_rgba8().pixels().map(|p| p.0).collect()
        };

        Ok(Self::from_rgba8(width, height, &pixels))
    }

    /// 读取纹理，失败只打印警告并返回替代纹理，渲染继续
    pub fn load_or_placeholder(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(texture) => {
                log::debug!(
                    "已加载纹理 {} ({}x{}, {}级mipmap)",
                    path.display(),
                    texture.width,
                    texture.height,
                    texture.mip_levels()
                );
                texture
            }
            Err(err) => {
                log::warn!("纹理加载失败: {} ({err})", path.display());
                Self::placeholder()
            }
        }
    }

    pub fn mip_levels(&self) -> usize {
        self.levels.len()
    }

    /// 放大采样（第0级双线性）
    pub fn sample(&self, uv: Vec2<f32>) -> Vec4<f32> {
        self.levels[0].sample_bilinear(uv)
    }

    /// 三线性采样。uv_density 为每屏幕像素覆盖的 UV 面积，
    /// 乘以纹理面积即为每像素覆盖的纹素数。
    pub fn sample_with_density(&self, uv: Vec2<f32>, uv_density: f32) -> Vec4<f32> {
        let texels_per_pixel = uv_density * (self.width * self.height) as f32;
        if !(texels_per_pixel > 1.0) {
            return self.sample(uv);
        }
        let lod = (0.5 * texels_per_pixel.log2()).min((self.levels.len() - 1) as f32);
        let base = lod.floor() as usize;
        let t = lod - base as f32;

        let a = self.levels[base].sample_bilinear(uv);
        if t <= 0.0 || base + 1 >= self.levels.len() {
            return a;
        }
        let b = self.levels[base + 1].sample_bilinear(uv);
        a * (1.0 - t) + b * t
    }
}
