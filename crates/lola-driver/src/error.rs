//! 驱动层错误类型定义

use crate::config::ConfigError;
use lola_link::LinkError;
use lola_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 周期内的故障都在本地处理（重连、丢帧、降级），
/// 只有无法恢复的错误才会从 [`Bridge::run`](crate::Bridge::run) 返回。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 协议错误（只有致命的协议错误会传播到这里）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误（构造桥接时校验）
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
