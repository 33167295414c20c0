//! 上游（前端）存活检测
//!
//! 每个周期比较上游执行器消息的 tick：变化则计数器加一（上限 `max_count`），
//! 未变化或本周期没有新消息则减一（下限 0）。
//!
//! 滞回规则：
//! - 未连接且计数器超过 `connect_threshold` → 已连接
//! - 已连接且计数器降到 0 → 断开

use crate::config::LivenessConfig;
use tracing::info;

/// 连接状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTransition {
    Connected,
    Disconnected,
}

/// 存活检测器
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    max_count: u32,
    connect_threshold: u32,
    last_tick: Option<u64>,
    count: u32,
    connected: bool,
}

impl LivenessMonitor {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            max_count: config.max_count,
            connect_threshold: config.connect_threshold,
            last_tick: None,
            count: 0,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// 当前滞回计数
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    /// 更新一个周期
    ///
    /// `tick` 为本周期取到的上游 tick，`None` 表示等待超时（视为未变化）。
    pub fn update(&mut self, tick: Option<u64>) -> Option<LivenessTransition> {
        match tick {
            Some(t) if self.last_tick != Some(t) => {
                self.last_tick = Some(t);
                self.count = (self.count + 1).min(self.max_count);
            },
            _ => {
                self.count = self.count.saturating_sub(1);
            },
        }

        if !self.connected && self.count > self.connect_threshold {
            self.connected = true;
            info!("New frontend connection established.");
            Some(LivenessTransition::Connected)
        } else if self.connected && self.count == 0 {
            self.connected = false;
            info!("Lost frontend connection.");
            Some(LivenessTransition::Disconnected)
        } else {
            None
        }
    }
}
