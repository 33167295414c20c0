//! 链路层错误类型定义

use thiserror::Error;

/// 链路错误
///
/// 所有链路错误都可以通过重新连接恢复。
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 对端关闭连接（读到 EOF）
    #[error("Connection closed by peer")]
    Closed,

    /// 接收超时（超过链路的名义超时仍无数据）
    #[error("Receive timeout")]
    Timeout,

    /// 尚未连接
    #[error("Link not connected")]
    NotConnected,

    /// 端点地址无效
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl LinkError {
    /// 将 IO 错误归类（超时类错误单独区分）
    pub(crate) fn from_io(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => LinkError::Timeout,
            std::io::ErrorKind::UnexpectedEof => LinkError::Closed,
            _ => LinkError::Io(e),
        }
    }
}
