use thiserror::Error;

use crate::compositor::FramePhase;
use crate::tangent::TangentError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("窗口错误: {0}")]
    Window(#[from] minifb::Error),

    #[error("帧缓冲不完整: {0}")]
    IncompleteFramebuffer(String),

    #[error(transparent)]
    Tangent(#[from] TangentError),

    #[error("缺少 uniform `{0}`")]
    MissingUniform(String),

    #[error("uniform `{name}` 类型错误，期望 {expected}")]
    UniformType { name: String, expected: &'static str },

    #[error("帧阶段错误: 期望 {expected:?}，当前 {found:?}")]
    FramePhase {
        expected: FramePhase,
        found: FramePhase,
    },

    #[error("模型加载失败: {0}")]
    Model(#[from] tobj::LoadError),

    #[error("图像读写失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("配置解析失败: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
