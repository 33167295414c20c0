//! 协作式取消标志

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 进程级运行标志（协作式取消）
///
/// 只在阻塞调用之间轮询（连接重试前、主循环顶部），不会打断正在进行的套接字调用，
/// 因此停止延迟受套接字超时约束。
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// 请求停止（可从信号处理线程调用）
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
