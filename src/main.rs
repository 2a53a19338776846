mod camera;
mod compositor;
mod config;
mod error;
mod framebuffer;
mod input;
mod model;
mod rasterizer;
mod renderer;
mod run_app;
mod scene;
mod tangent;
mod texture;
mod time;
mod vertex;

use std::path::Path;
use std::sync::Once;

pub const WINDOW_WIDTH: usize = 1100;
pub const WINDOW_HEIGHT: usize = 850;

static LOGGER: Once = Once::new();

/// 只初始化一次。过滤规则依次取配置、RUST_LOG、默认 info。
fn init_logging(filter: Option<&str>) {
    LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Some(filter) = filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }
        builder.init();
    });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match config::load_config(Path::new(config::CONFIG_FILE)) {
        Ok(config) => config,
        Err(err) => {
            init_logging(None);
            log::error!("读取 {} 失败: {err}", config::CONFIG_FILE);
            return Err(err.into());
        }
    };
    init_logging(config.log_filter.as_deref());
    log::debug!("配置: {config:?}");

    if let Err(err) = run_app::run_app(&config) {
        log::error!("{err}");
        return Err(err.into());
    }
    Ok(())
}
