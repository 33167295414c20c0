//! 连接生命周期
//!
//! 状态机：`Disconnected → Connecting → Connected → (IO 错误) → Disconnected`
//!
//! `connect` 以固定退避时间无限重试，直到成功或运行标志被清除；
//! 每次重试前都检查运行标志，保证停止请求不会被无限推迟。

use crate::{LinkError, LolaLink, RunFlag};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 默认重连退避时间
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 未连接（初始状态或 IO 错误之后）
    Disconnected,
    /// 正在连接（重试中）
    Connecting,
    /// 已连接
    Connected,
}

/// 拥有链路的连接状态机
pub struct Connection<L: LolaLink> {
    link: L,
    state: ConnectionState,
    backoff: Duration,
}

impl<L: LolaLink> Connection<L> {
    pub fn new(link: L) -> Self {
        Self::with_backoff(link, DEFAULT_RECONNECT_BACKOFF)
    }

    pub fn with_backoff(link: L, backoff: Duration) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
            backoff,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// 阻塞连接，失败后按退避时间重试
    ///
    /// # 返回
    /// - `true`: 已连接
    /// - `false`: 运行标志被清除，放弃连接（状态回到 `Disconnected`）
    pub fn connect(&mut self, running: &RunFlag) -> bool {
        self.state = ConnectionState::Connecting;
        let mut attempts: u64 = 0;

        loop {
            if !running.is_running() {
                debug!("Connect aborted after {} attempts", attempts);
                self.state = ConnectionState::Disconnected;
                return false;
            }

            attempts += 1;
            match self.link.connect() {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    info!("LoLA link connected (attempt {})", attempts);
                    return true;
                },
                Err(e) => {
                    self.link.close();
                    if attempts == 1 {
                        warn!(
                            "Failed to connect to LoLA: {}. Retrying every {:?}...",
                            e, self.backoff
                        );
                    } else {
                        debug!("Connect attempt {} failed: {}", attempts, e);
                    }
                    thread::sleep(self.backoff);
                },
            }
        }
    }

    /// 接收一帧；任何错误都会把连接标记为断开
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.link.receive(buf).inspect_err(|e| self.fail(e))
    }

    /// 发送一帧；任何错误都会把连接标记为断开
    pub fn send(&mut self, pkt: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.link.send(pkt).inspect_err(|e| self.fail(e))
    }

    /// 主动断开
    pub fn disconnect(&mut self) {
        self.link.close();
        self.state = ConnectionState::Disconnected;
    }

    fn fail(&mut self, e: &LinkError) {
        error!("LoLA socket error: {}", e);
        self.disconnect();
    }
}
