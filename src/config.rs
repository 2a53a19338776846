use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::RenderError;
use crate::{WINDOW_HEIGHT, WINDOW_WIDTH};

/// 工作目录下的可选配置文件
pub const CONFIG_FILE: &str = "room.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub assets: AssetConfig,
    pub post: PostConfig,
    pub transparency: TransparentOrder,
    /// env_logger 过滤语法，例如 "info" 或 "room_renderer=debug"
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: usize,
    pub height: usize,
    pub target_fps: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub texture_dir: PathBuf,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub kernel: KernelKind,
    pub resize_policy: ResizePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[default]
    Gaussian,
    Box,
}

/// 窗口尺寸变化时离屏目标的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// 保持创建时的尺寸，合成时缩放
    Fixed,
    /// 重新分配颜色与深度/模板附件
    #[default]
    FollowWindow,
}

/// 半透明物体的绘制顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparentOrder {
    /// 按声明顺序，要求半透明物体互不遮挡
    Insertion,
    /// 按到相机距离由远到近
    #[default]
    BackToFront,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Room".to_string(),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            target_fps: 60,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 1.4, 4.95],
            yaw: -90.0,
            pitch: 0.0,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("resources/textures"),
            model_path: PathBuf::from("resources/objects/rust_gas/Gasoline_barrel.obj"),
        }
    }
}

pub fn parse_json(path: &Path) -> Result<AppConfig, RenderError> {
    let file = File::open(path)?;
    let config: AppConfig = serde_json::from_reader(BufReader::new(file))?;
    Ok(config)
}

/// 配置文件不存在时使用默认值；存在但解析失败视为错误
pub fn load_config(path: &Path) -> Result<AppConfig, RenderError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    parse_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.window.width, WINDOW_WIDTH);
        assert_eq!(config.post.resize_policy, ResizePolicy::FollowWindow);
        assert_eq!(config.transparency, TransparentOrder::BackToFront);
        assert_eq!(config.camera.position, [0.0, 1.4, 4.95]);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "window": {{ "width": 640 }},
                "post": {{ "kernel": "box", "resize_policy": "fixed" }},
                "transparency": "insertion",
                "log_filter": "debug"
            }}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, WINDOW_HEIGHT);
        assert_eq!(config.post.kernel, KernelKind::Box);
        assert_eq!(config.post.resize_policy, ResizePolicy::Fixed);
        assert_eq!(config.transparency, TransparentOrder::Insertion);
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"window\": 3 }}").unwrap();

        assert!(matches!(
            load_config(file.path()),
            Err(RenderError::Config(_))
        ));
    }
}
