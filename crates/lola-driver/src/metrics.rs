//! 桥接运行指标
//!
//! 原子计数器，可在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接实时指标
///
/// # 使用示例
///
/// ```rust
/// use lola_driver::BridgeMetrics;
/// use std::sync::Arc;
///
/// let metrics = Arc::new(BridgeMetrics::default());
/// metrics.frames_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.frames_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 接收的 LoLA 帧总数（包括被丢弃的帧）
    pub frames_received: AtomicU64,

    /// 丢弃的帧数（截断/过大/格式错误）
    pub frames_dropped: AtomicU64,

    /// 发送的执行器帧数
    pub frames_sent: AtomicU64,

    /// 链路错误次数
    pub link_errors: AtomicU64,

    /// 重连次数
    pub reconnects: AtomicU64,

    /// 等待上游执行器数据超时次数（上游未运行时每个周期都会增长）
    pub actuator_timeouts: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            link_errors: self.link_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            actuator_timeouts: self.actuator_timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.frames_received.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.frames_sent.store(0, Ordering::Relaxed);
        self.link_errors.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
        self.actuator_timeouts.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_sent: u64,
    pub link_errors: u64,
    pub reconnects: u64,
    pub actuator_timeouts: u64,
}

impl MetricsSnapshot {
    /// 丢帧率（百分比），未收到帧时返回 0.0
    pub fn drop_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.frames_dropped as f64 / self.frames_received as f64) * 100.0
    }
}
