use std::time::{Duration, Instant};

/// 帧间隔计时，限制异常大的间隔（拖动窗口、断点调试后）
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_delta: Duration,
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            max_delta: Duration::from_millis(250),
            frame_index: 0,
        }
    }

    /// 返回距上一帧的秒数
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last).min(self.max_delta);
        self.last = now;
        self.frame_index += 1;
        delta.as_secs_f32()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
