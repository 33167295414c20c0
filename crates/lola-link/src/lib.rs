//! # LoLA Link
//!
//! LoLA 套接字链路层：流式套接字抽象、带重试的连接生命周期、协作式停止标志。
//!
//! ## 模块
//!
//! - `socket`: UNIX / TCP 流式套接字实现（[`SocketLink`]）
//! - `connection`: 连接状态机（[`Connection`]），负责连接重试与断线标记
//! - `run_flag`: 进程级运行标志（[`RunFlag`]）

pub mod connection;
mod error;
mod run_flag;
pub mod socket;

pub use connection::{Connection, ConnectionState, DEFAULT_RECONNECT_BACKOFF};
pub use error::LinkError;
pub use run_flag::RunFlag;
pub use socket::{LolaEndpoint, SocketLink};

/// LoLA 链路抽象
///
/// 每次 `receive` 读取一个完整的 LoLA 帧（一次套接字读取），`send` 写出一个完整的执行器帧。
/// 任何错误都意味着链路不可用，需要由 [`Connection`] 重新连接。
pub trait LolaLink {
    /// 建立连接（单次尝试）
    fn connect(&mut self) -> Result<(), LinkError>;

    /// 接收一帧，返回写入 `buf` 的字节数
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 发送一帧
    fn send(&mut self, pkt: &[u8]) -> Result<(), LinkError>;

    /// 关闭连接（幂等）
    fn close(&mut self);
}
