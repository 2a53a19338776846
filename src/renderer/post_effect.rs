use cgmath::Vector4 as Vec4;
use rayon::prelude::*;

use crate::config::KernelKind;
use crate::error::RenderError;
use crate::framebuffer::{FrameBuffer, pack_color};
use crate::renderer::uniforms::Uniforms;

/// 3x3 卷积核，行优先，权重和为 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    pub weights: [[f32; 3]; 3],
}

impl Kernel {
    pub fn gaussian() -> Self {
        let w = |v: f32| v / 16.0;
        Self {
            weights: [
                [w(1.0), w(2.0), w(1.0)],
                [w(2.0), w(4.0), w(2.0)],
                [w(1.0), w(2.0), w(1.0)],
            ],
        }
    }

    pub fn box_filter() -> Self {
        Self {
            weights: [[1.0 / 9.0; 3]; 3],
        }
    }

    #[cfg(test)]
    pub fn sum(&self) -> f32 {
        self.weights.iter().flatten().sum()
    }
}

impl From<KernelKind> for Kernel {
    fn from(kind: KernelKind) -> Self {
        match kind {
            KernelKind::Gaussian => Kernel::gaussian(),
            KernelKind::Box => Kernel::box_filter(),
        }
    }
}

/// 全屏后处理：直通或模糊
#[derive(Debug, Clone, Copy)]
pub struct ScreenShader {
    pub blur: bool,
    pub kernel: Kernel,
}

impl ScreenShader {
    /// 读取 `blur` 和 `screenTexture`。离屏颜色固定绑定在 0 号纹理单元。
    pub fn from_uniforms(uniforms: &Uniforms, kernel: Kernel) -> Result<Self, RenderError> {
        let blur = uniforms.get_bool("blur")?;
        if uniforms.get_int("screenTexture")? != 0 {
            return Err(RenderError::UniformType {
                name: "screenTexture".to_string(),
                expected: "texture unit 0",
            });
        }
        Ok(Self { blur, kernel })
    }

    /// 在纹理坐标 (u, v) 处采样源图。偏移一个源纹素，边缘截断。
    pub fn shade(&self, source: &FrameBuffer, u: f32, v: f32) -> Vec4<f32> {
        if !self.blur {
            return source.sample_bilinear(u, v);
        }

        let texel_w = 1.0 / source.width as f32;
        let texel_h = 1.0 / source.height as f32;
        let mut color = Vec4::new(0.0, 0.0, 0.0, 0.0);
        for (row, dy) in (-1..=1).enumerate() {
            for (col, dx) in (-1..=1).enumerate() {
                let sample = source.sample_bilinear(
                    u + dx as f32 * texel_w,
                    v + dy as f32 * texel_h,
                );
                color += sample * self.kernel.weights[row][col];
            }
        }
        color
    }

    /// 对目标的每个像素采样源图，两者尺寸可以不同（按比例缩放）
    pub fn apply(&self, source: &FrameBuffer, dest: &mut FrameBuffer) {
        let (width, height) = (dest.width, dest.height);
        if width == 0 || height == 0 || source.width == 0 || source.height == 0 {
            return;
        }

        dest.data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let v = (y as f32 + 0.5) / height as f32;
                for (x, pixel) in row.iter_mut().enumerate() {
                    let u = (x as f32 + 0.5) / width as f32;
                    let mut color = self.shade(source, u, v);
                    color.w = 1.0;
                    *pixel = pack_color(color);
                }
            });
    }
}
