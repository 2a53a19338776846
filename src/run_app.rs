use minifb::{Window, WindowOptions};

use crate::camera::Camera;
use crate::compositor::Compositor;
use crate::config::AppConfig;
use crate::error::RenderError;
use crate::framebuffer::FrameBuffer;
use crate::input::{AppState, InputSnapshot, MouseTracker};
use crate::renderer::Renderer;
use crate::renderer::uniforms::Uniforms;
use crate::scene::{RoomAssets, RoomScene};
use crate::time::FrameClock;

// 每隔多少帧打印一次帧率
const FPS_LOG_INTERVAL: u64 = 300;

/// 打开窗口并运行主循环，直到窗口关闭或按下 Esc
pub fn run_app(config: &AppConfig) -> Result<(), RenderError> {
    let (width, height) = (config.window.width, config.window.height);
    let mut window = Window::new(
        &config.window.title,
        width,
        height,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(config.window.target_fps);

    let mut renderer = Renderer::new();
    let mut compositor = Compositor::new(
        width,
        height,
        config.post.resize_policy,
        config.post.kernel,
    )?;
    let mut screen = FrameBuffer::new(width, height);

    let scene = RoomScene::build(RoomAssets::load(&config.assets), config.transparency)?;
    let camera = Camera::new(
        config.camera.position.into(),
        config.camera.yaw,
        config.camera.pitch,
    );
    let mut state = AppState::new(camera);

    let mut uniforms = Uniforms::new();
    uniforms.set_int("screenTexture", 0);

    let mut clock = FrameClock::new();
    let mut mouse = MouseTracker::default();
    let mut elapsed = 0.0;
    log::info!("窗口 {width}x{height} 已打开");

    while window.is_open() && !state.quit_requested {
        let delta_time = clock.tick();
        let input = InputSnapshot::capture(&window, &mut mouse);
        state.apply_input(&input, delta_time);

        // 只在两帧之间处理窗口尺寸变化
        let (window_width, window_height) = input.window_size;
        compositor.handle_resize(window_width, window_height)?;
        let size_changed = (screen.width, screen.height) != input.window_size;
        if window_width > 0 && window_height > 0 && size_changed {
            screen.resize(window_width, window_height);
        }

        let target = compositor.begin_offscreen(&mut renderer)?;
        scene.render(&mut renderer, target, &state, &mut uniforms)?;

        uniforms.set_bool("blur", state.blur);
        compositor.composite(&mut renderer, &mut screen, &uniforms)?;
        compositor.present(&screen, |data, w, h| Ok(window.update_with_buffer(data, w, h)?))?;

        if state.screenshot_requested {
            let path = format!("screenshot_{:05}.png", clock.frame_index());
            match screen.save_to_image(&path) {
                Ok(()) => log::info!("截图已保存: {path}"),
                Err(err) => log::warn!("截图保存失败: {path} ({err})"),
            }
        }
        compositor.finish_frame()?;

        elapsed += delta_time;
        if clock.frame_index() % FPS_LOG_INTERVAL == 0 {
            log::debug!("平均帧率 {:.1}", FPS_LOG_INTERVAL as f32 / elapsed);
            elapsed = 0.0;
        }
    }

    log::info!("共渲染 {} 帧，退出", clock.frame_index());
    Ok(())
}
