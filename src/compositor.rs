use crate::config::{KernelKind, ResizePolicy};
use crate::error::RenderError;
use crate::framebuffer::FrameBuffer;
use crate::renderer::post_effect::{Kernel, ScreenShader};
use crate::renderer::uniforms::Uniforms;
use crate::renderer::{PipelineState, Renderer};

/// 离屏清屏色 (0.1, 0.1, 0.1)
pub const OFFSCREEN_CLEAR: u32 = 0xFF1A1A1A;
pub const SCREEN_CLEAR: u32 = 0xFFFFFFFF;

/// 每帧严格按 Idle -> RenderingOffscreen -> Compositing -> Presented -> Idle 推进
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    RenderingOffscreen,
    Compositing,
    Presented,
}

/// 离屏渲染目标：颜色附件 + 深度/模板附件，尺寸一致
#[derive(Debug)]
pub struct RenderTarget {
    framebuffer: FrameBuffer,
}

impl RenderTarget {
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        let framebuffer = FrameBuffer::new(width, height);
        framebuffer.check_complete()?;
        Ok(Self { framebuffer })
    }

    /// 重新分配所有附件并再次检查完整性
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        self.framebuffer.resize(width, height);
        self.framebuffer.check_complete()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.framebuffer.width, self.framebuffer.height)
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }
}

pub struct Compositor {
    target: RenderTarget,
    phase: FramePhase,
    policy: ResizePolicy,
    kernel: Kernel,
}

impl Compositor {
    /// 创建离屏目标；不完整直接返回错误
    pub fn new(
        width: usize,
        height: usize,
        policy: ResizePolicy,
        kernel: KernelKind,
    ) -> Result<Self, RenderError> {
        let target = RenderTarget::new(width, height)?;
        log::debug!("离屏目标 {width}x{height}, 尺寸策略 {policy:?}, 模糊核 {kernel:?}");
        Ok(Self {
            target,
            phase: FramePhase::Idle,
            policy,
            kernel: kernel.into(),
        })
    }

    #[cfg(test)]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[cfg(test)]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    fn expect_phase(&self, expected: FramePhase) -> Result<(), RenderError> {
        if self.phase != expected {
            return Err(RenderError::FramePhase {
                expected,
                found: self.phase,
            });
        }
        Ok(())
    }

    /// 开启深度测试，清空离屏颜色与深度/模板，返回本帧的绘制目标
    pub fn begin_offscreen(
        &mut self,
        renderer: &mut Renderer,
    ) -> Result<&mut FrameBuffer, RenderError> {
        self.expect_phase(FramePhase::Idle)?;
        renderer.state = PipelineState::default();

        let framebuffer = &mut self.target.framebuffer;
        framebuffer.clear(OFFSCREEN_CLEAR);
        framebuffer.clear_depth_stencil();
        self.phase = FramePhase::RenderingOffscreen;
        Ok(framebuffer)
    }

    /// 关闭深度测试，屏幕清为白色，再用全屏 pass 采样离屏颜色
    pub fn composite(
        &mut self,
        renderer: &mut Renderer,
        screen: &mut FrameBuffer,
        uniforms: &Uniforms,
    ) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::RenderingOffscreen)?;
        let shader = ScreenShader::from_uniforms(uniforms, self.kernel)?;

        renderer.state.depth_test = false;
        renderer.state.blend = false;
        screen.clear(SCREEN_CLEAR);
        shader.apply(self.target.framebuffer(), screen);

        self.phase = FramePhase::Compositing;
        Ok(())
    }

    /// 把屏幕缓冲交给窗口
    pub fn present<F>(&mut self, screen: &FrameBuffer, sink: F) -> Result<(), RenderError>
    where
        F: FnOnce(&[u32], usize, usize) -> Result<(), RenderError>,
    {
        self.expect_phase(FramePhase::Compositing)?;
        sink(&screen.data, screen.width, screen.height)?;
        self.phase = FramePhase::Presented;
        Ok(())
    }

    pub fn finish_frame(&mut self) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Presented)?;
        self.phase = FramePhase::Idle;
        Ok(())
    }

    /// 只能在两帧之间调用。最小化时窗口尺寸为零，保持原目标不动。
    pub fn handle_resize(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Idle)?;
        if self.policy == ResizePolicy::Fixed || self.target.size() == (width, height) {
            return Ok(());
        }
        if width == 0 || height == 0 {
            log::debug!("窗口尺寸为零，跳过离屏目标重建");
            return Ok(());
        }

        self.target.resize(width, height)?;
        log::info!("离屏目标已重建为 {width}x{height}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::fragment_shader::testing::FlatColorShader;
    use crate::vertex::{Triangle, Vertex};
    use cgmath::{Matrix4 as Mat4, SquareMatrix, Vector4 as Vec4};

    fn screen_uniforms(blur: bool) -> Uniforms {
        let mut uniforms = Uniforms::new();
        uniforms.set_bool("blur", blur);
        uniforms.set_int("screenTexture", 0);
        uniforms
    }

    fn scene_uniforms() -> Uniforms {
        let mut uniforms = Uniforms::new();
        uniforms.set_mat4("model", Mat4::identity());
        uniforms.set_mat4("view", Mat4::identity());
        uniforms.set_mat4("projection", Mat4::identity());
        uniforms
    }

    fn triangles() -> Vec<Triangle> {
        vec![
            Triangle::new(
                Vertex::new([-0.8, -0.6, 0.2], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([0.7, -0.9, 0.2], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex::new([0.1, 0.9, 0.2], [0.0, 0.0, 1.0], [0.5, 1.0]),
            ),
            Triangle::new(
                Vertex::new([-0.2, -0.2, -0.3], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([0.9, 0.1, -0.3], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex::new([0.0, 0.8, -0.3], [0.0, 0.0, 1.0], [0.5, 1.0]),
            ),
        ]
    }

    fn draw_scene(renderer: &Renderer, target: &mut FrameBuffer) {
        let colors = [Vec4::new(0.9, 0.3, 0.1, 1.0), Vec4::new(0.2, 0.6, 0.8, 1.0)];
        for (triangle, color) in triangles().into_iter().zip(colors) {
            renderer
                .draw_triangles(target, &[triangle], &scene_uniforms(), &FlatColorShader { color })
                .unwrap();
        }
    }

    fn run_frame(compositor: &mut Compositor, blur: bool, screen: &mut FrameBuffer) -> Vec<u32> {
        let mut renderer = Renderer::new();
        let target = compositor.begin_offscreen(&mut renderer).unwrap();
        draw_scene(&renderer, target);
        compositor
            .composite(&mut renderer, screen, &screen_uniforms(blur))
            .unwrap();
        assert!(!renderer.state.depth_test);

        let mut presented = Vec::new();
        compositor
            .present(screen, |data, _, _| {
                presented = data.to_vec();
                Ok(())
            })
            .unwrap();
        compositor.finish_frame().unwrap();
        presented
    }

    #[test]
    fn pass_through_matches_direct_rendering() {
        let mut direct = FrameBuffer::new(40, 30);
        direct.clear(OFFSCREEN_CLEAR);
        draw_scene(&Renderer::new(), &mut direct);

        let mut compositor =
            Compositor::new(40, 30, ResizePolicy::FollowWindow, KernelKind::Gaussian).unwrap();
        let mut screen = FrameBuffer::new(40, 30);
        let presented = run_frame(&mut compositor, false, &mut screen);

        assert_eq!(presented, direct.data);
        assert_eq!(compositor.phase(), FramePhase::Idle);
    }

    #[test]
    fn blur_conserves_energy_of_a_bright_pixel() {
        let mut compositor =
            Compositor::new(9, 9, ResizePolicy::FollowWindow, KernelKind::Gaussian).unwrap();
        let mut renderer = Renderer::new();
        let target = compositor.begin_offscreen(&mut renderer).unwrap();
        target.clear(0xFF000000);
        target.put_pixel(4, 4, 0xFFFFFFFF);

        let mut screen = FrameBuffer::new(9, 9);
        compositor
            .composite(&mut renderer, &mut screen, &screen_uniforms(true))
            .unwrap();

        let green = |x: usize, y: usize| ((screen.get_pixel(x, y) >> 8) & 0xFF) as i32;
        let lit = (0..9)
            .flat_map(|y| (0..9).map(move |x| (x, y)))
            .filter(|&(x, y)| green(x, y) > 0)
            .count();
        assert_eq!(lit, 9);
        let total: i32 = (0..9)
            .flat_map(|y| (0..9).map(move |x| (x, y)))
            .map(|(x, y)| green(x, y))
            .sum();
        assert!((total - 255).abs() <= 9);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut compositor =
            Compositor::new(8, 8, ResizePolicy::FollowWindow, KernelKind::Gaussian).unwrap();
        let mut renderer = Renderer::new();
        let mut screen = FrameBuffer::new(8, 8);

        assert!(matches!(
            compositor.composite(&mut renderer, &mut screen, &screen_uniforms(false)),
            Err(RenderError::FramePhase {
                expected: FramePhase::RenderingOffscreen,
                found: FramePhase::Idle
            })
        ));
        assert!(compositor.present(&screen, |_, _, _| Ok(())).is_err());

        compositor.begin_offscreen(&mut renderer).unwrap();
        assert!(compositor.begin_offscreen(&mut renderer).is_err());
        assert!(compositor.handle_resize(16, 16).is_err());
        assert!(compositor.finish_frame().is_err());
    }

    #[test]
    fn missing_blur_uniform_keeps_phase() {
        let mut compositor =
            Compositor::new(8, 8, ResizePolicy::FollowWindow, KernelKind::Box).unwrap();
        let mut renderer = Renderer::new();
        let mut screen = FrameBuffer::new(8, 8);
        compositor.begin_offscreen(&mut renderer).unwrap();

        let mut uniforms = Uniforms::new();
        uniforms.set_int("screenTexture", 0);
        assert!(compositor.composite(&mut renderer, &mut screen, &uniforms).is_err());
        assert_eq!(compositor.phase(), FramePhase::RenderingOffscreen);
    }

    #[test]
    fn follow_window_reallocates_and_fixed_keeps_size() {
        let mut follow =
            Compositor::new(8, 6, ResizePolicy::FollowWindow, KernelKind::Gaussian).unwrap();
        follow.handle_resize(20, 10).unwrap();
        assert_eq!(follow.target().size(), (20, 10));
        let fb = follow.target().framebuffer();
        assert_eq!(fb.depth.len(), 200);
        assert_eq!(fb.stencil.len(), 200);

        // 最小化
        follow.handle_resize(0, 0).unwrap();
        assert_eq!(follow.target().size(), (20, 10));

        let mut fixed = Compositor::new(8, 6, ResizePolicy::Fixed, KernelKind::Gaussian).unwrap();
        fixed.handle_resize(20, 10).unwrap();
        assert_eq!(fixed.target().size(), (8, 6));
    }

    #[test]
    fn fixed_target_is_scaled_to_the_whole_screen() {
        let mut compositor =
            Compositor::new(8, 6, ResizePolicy::Fixed, KernelKind::Gaussian).unwrap();
        compositor.handle_resize(16, 12).unwrap();
        let mut screen = FrameBuffer::new(16, 12);
        let presented = run_frame(&mut compositor, false, &mut screen);

        // 白色清屏被全屏 pass 完全覆盖
        assert!(presented.iter().all(|&p| p != SCREEN_CLEAR));
    }

    #[test]
    fn zero_sized_target_is_incomplete() {
        assert!(matches!(
            Compositor::new(0, 10, ResizePolicy::FollowWindow, KernelKind::Gaussian),
            Err(RenderError::IncompleteFramebuffer(_))
        ));
    }
}
