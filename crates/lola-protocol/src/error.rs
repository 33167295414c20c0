//! 协议层错误类型定义

use thiserror::Error;

/// 协议解析/编码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧长度小于协议最小值（不完整的 msgpack 对象）
    #[error("Truncated frame: {len} bytes (minimum {min})")]
    Truncated { len: usize, min: usize },

    /// 帧长度达到接收缓冲区上限（可能被截断或粘包）
    #[error("Oversized frame: {len} bytes (maximum {max})")]
    Oversized { len: usize, max: usize },

    /// msgpack 结构无法解析
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// 帧中出现通道映射未定义的 chain
    #[error("Unknown chain '{0}' in LoLA frame")]
    UnknownChain(String),

    /// chain 数组长度与通道映射不一致
    #[error("Chain '{chain}' size mismatch: expected {expected}, got {actual}")]
    ChainSizeMismatch {
        chain: String,
        expected: usize,
        actual: usize,
    },

    /// 编码失败
    #[error("Encode error: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// 是否为致命错误
    ///
    /// 致命错误说明协议版本或通道映射与硬件不匹配，无法在运行中恢复。
    /// 其余错误只影响单个帧，丢弃即可。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnknownChain(_) | ProtocolError::ChainSizeMismatch { .. }
        )
    }
}
