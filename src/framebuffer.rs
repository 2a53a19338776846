use cgmath::Vector4 as Vec4;

use crate::error::RenderError;

/// 深度缓冲清除值（对应 NDC 远平面映射后的 1.0）
pub const DEPTH_CLEAR: f32 = 1.0;

/// 颜色附件 + 深度/模板附件。颜色按 0xAARRGGBB 打包，可直接交给 minifb。
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub depth: Vec<f32>,
    pub stencil: Vec<u8>,
}

/// 0.0~1.0 的 RGBA 转为 0xAARRGGBB（minifb 的像素布局，四舍五入保证往返不丢精度）。
/// 纹理内部用的是 0xRRGGBBAA，见 `texture::pack_rrggbbaa`。
pub fn pack_color(color: Vec4<f32>) -> u32 {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    to_byte(color.w) << 24 | to_byte(color.x) << 16 | to_byte(color.y) << 8 | to_byte(color.z)
}

pub fn unpack_color(color: u32) -> Vec4<f32> {
    Vec4::new(
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
        ((color >> 24) & 0xFF) as f32 / 255.0,
    )
}

/// 标准 alpha 混合: src * a + dst * (1 - a)，目标 alpha 保持不透明
pub fn blend_over(src: Vec4<f32>, dst: u32) -> u32 {
    let dst = unpack_color(dst);
    let a = src.w.clamp(0.0, 1.0);
    pack_color(Vec4::new(
        src.x * a + dst.x * (1.0 - a),
        src.y * a + dst.y * (1.0 - a),
        src.z * a + dst.z * (1.0 - a),
        a + dst.w * (1.0 - a),
    ))
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            data: vec![0xFF000000; width * height],
            depth: vec![DEPTH_CLEAR; width * height],
            stencil: vec![0; width * height],
        }
    }

    /// 检查附件尺寸是否一致、是否非空
    pub fn check_complete(&self) -> Result<(), RenderError> {
        let expected = self.width * self.height;
        if expected == 0 {
            return Err(RenderError::IncompleteFramebuffer(format!(
                "附件尺寸为零 ({}x{})",
                self.width, self.height
            )));
        }
        if self.data.len() != expected
            || self.depth.len() != expected
            || self.stencil.len() != expected
        {
            return Err(RenderError::IncompleteFramebuffer(format!(
                "附件大小不一致: 颜色 {}, 深度 {}, 模板 {}, 期望 {}",
                self.data.len(),
                self.depth.len(),
                self.stencil.len(),
                expected
            )));
        }
        Ok(())
    }

    /// 只清除颜色
    pub fn clear(&mut self, color: u32) {
        self.data.fill(color);
    }

    pub fn clear_depth_stencil(&mut self) {
        self.depth.fill(DEPTH_CLEAR);
        self.stencil.fill(0);
    }

    /// 重新分配所有附件，内容被清空
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        *self = FrameBuffer::new(width, height);
    }

    #[cfg(test)]
    pub fn get_pixel(&self, x: usize, y: usize) -> u32 {
        self.data[y * self.width + x]
    }

    #[cfg(test)]
    pub fn put_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = color;
        }
    }

    /// 按纹理坐标双线性采样颜色附件（边缘截断）。
    /// 像素中心位于 (i + 0.5) / size，尺寸一致时逐像素采样恰好取到原值。
    pub fn sample_bilinear(&self, u: f32, v: f32) -> Vec4<f32> {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;

        let fetch = |xi: f32, yi: f32| {
            let xi = (xi as i64).clamp(0, self.width as i64 - 1) as usize;
            let yi = (yi as i64).clamp(0, self.height as i64 - 1) as usize;
            unpack_color(self.data[yi * self.width + xi])
        };

        let top = fetch(x0, y0) * (1.0 - tx) + fetch(x0 + 1.0, y0) * tx;
        let bottom = fetch(x0, y0 + 1.0) * (1.0 - tx) + fetch(x0 + 1.0, y0 + 1.0) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    pub fn save_to_image(&self, filepath: &str) -> Result<(), image::ImageError> {
        use image::{ImageBuffer, Rgb};

        let mut img = ImageBuffer::new(self.width as u32, self.height as u32);

        for y in 0..self.height {
            for x in 0..self.width {
                let color = self.data[y * self.width + x];
                let r = ((color >> 16) & 0xFF) as u8;
                let g = ((color >> 8) & 0xFF) as u8;
                let b = (color & 0xFF) as u8;

                img.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
            }
        }

        img.save(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_colors_round_trip_exactly() {
        for color in [0xFF000000u32, 0xFFFFFFFF, 0xFF1A1A1A, 0x80FF7F01] {
            assert_eq!(pack_color(unpack_color(color)), color);
        }
    }

    #[test]
    fn new_buffer_is_complete_and_zero_sized_is_not() {
        assert!(FrameBuffer::new(4, 3).check_complete().is_ok());
        assert!(matches!(
            FrameBuffer::new(0, 3).check_complete(),
            Err(RenderError::IncompleteFramebuffer(_))
        ));

        let mut broken = FrameBuffer::new(4, 3);
        broken.depth.pop();
        assert!(broken.check_complete().is_err());
    }

    #[test]
    fn resize_reallocates_every_attachment() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(0xFFFF0000);
        fb.resize(5, 4);

        assert_eq!((fb.width, fb.height), (5, 4));
        assert_eq!(fb.data.len(), 20);
        assert_eq!(fb.depth.len(), 20);
        assert_eq!(fb.stencil.len(), 20);
        assert!(fb.check_complete().is_ok());
    }

    #[test]
    fn clear_color_leaves_depth_untouched() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.depth[0] = 0.25;
        fb.stencil[1] = 7;
        fb.clear(0xFF202020);
        assert_eq!(fb.depth[0], 0.25);

        fb.clear_depth_stencil();
        assert_eq!(fb.depth[0], DEPTH_CLEAR);
        assert_eq!(fb.stencil[1], 0);
        assert_eq!(fb.get_pixel(1, 0), 0xFF202020);
    }

    #[test]
    fn blending_half_alpha_averages_colors() {
        let out = blend_over(Vec4::new(1.0, 1.0, 1.0, 0.5), 0xFF000000);
        let c = unpack_color(out);
        assert!((c.x - 0.5).abs() < 1.0 / 255.0);
        assert_eq!(c.w, 1.0);

        // alpha 为 0 时目标不变
        assert_eq!(blend_over(Vec4::new(1.0, 0.0, 0.0, 0.0), 0xFF123456), 0xFF123456);
    }

    #[test]
    fn sampling_at_texel_centers_returns_texels() {
        let mut fb = FrameBuffer::new(3, 2);
        for (i, px) in fb.data.iter_mut().enumerate() {
            *px = 0xFF000000 | (i as u32 * 40);
        }
        for y in 0..2 {
            for x in 0..3 {
                let u = (x as f32 + 0.5) / 3.0;
                let v = (y as f32 + 0.5) / 2.0;
                assert_eq!(pack_color(fb.sample_bilinear(u, v)), fb.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn save_to_image_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut fb = FrameBuffer::new(4, 4);
        fb.clear(0xFF00FF00);
        fb.save_to_image(path.to_str().unwrap()).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(2, 2).0, [0, 255, 0]);
    }
}
