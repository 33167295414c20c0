//! UNIX / TCP 流式套接字链路
//!
//! 真机上 LoLA 监听 UNIX 套接字 `/tmp/robocup`，仿真器通过 TCP 提供相同协议。

use crate::{LinkError, LolaLink};
use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, trace};

/// 默认 UNIX 套接字路径
pub const DEFAULT_UNIX_PATH: &str = "/tmp/robocup";

/// 默认 TCP 地址（仿真器）
pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:10000";

/// LoLA 端点地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LolaEndpoint {
    /// UNIX 套接字路径
    Unix(PathBuf),
    /// TCP `host:port`（连接时解析）
    Tcp(String),
}

impl LolaEndpoint {
    /// 解析 TCP 端点
    ///
    /// 接受 `port`（使用 127.0.0.1）、`ip:port` 或 `host:port`。
    ///
    /// # Example
    ///
    /// ```
    /// use lola_link::LolaEndpoint;
    ///
    /// let ep = LolaEndpoint::tcp("10000").unwrap();
    /// assert_eq!(ep, LolaEndpoint::Tcp("127.0.0.1:10000".into()));
    /// ```
    pub fn tcp(addr: &str) -> Result<Self, LinkError> {
        let addr = addr.trim();
        if let Ok(port) = addr.parse::<u16>() {
            return Ok(LolaEndpoint::Tcp(format!("127.0.0.1:{}", port)));
        }
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(LolaEndpoint::Tcp(addr.to_string()))
            },
            _ => Err(LinkError::InvalidEndpoint(addr.to_string())),
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        LolaEndpoint::Unix(path.into())
    }
}

impl Default for LolaEndpoint {
    fn default() -> Self {
        LolaEndpoint::Unix(PathBuf::from(DEFAULT_UNIX_PATH))
    }
}

impl fmt::Display for LolaEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LolaEndpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            LolaEndpoint::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// 已连接的流
enum Stream {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Stream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Stream::Unix(s) => s.set_read_timeout(timeout),
            Stream::Tcp(s) => s.set_read_timeout(timeout),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Unix(s) => s.read(buf),
            Stream::Tcp(s) => s.read(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Unix(s) => s.write_all(buf),
            Stream::Tcp(s) => s.write_all(buf),
        }
    }

    fn shutdown(&self) {
        let _ = match self {
            Stream::Unix(s) => s.shutdown(Shutdown::Both),
            Stream::Tcp(s) => s.shutdown(Shutdown::Both),
        };
    }
}

/// 套接字链路
pub struct SocketLink {
    endpoint: LolaEndpoint,
    stream: Option<Stream>,
    receive_timeout: Option<Duration>,
}

impl SocketLink {
    pub fn new(endpoint: LolaEndpoint) -> Self {
        Self {
            endpoint,
            stream: None,
            receive_timeout: None,
        }
    }

    /// 设置接收超时（超过此时间无数据视为链路错误）
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    pub fn endpoint(&self) -> &LolaEndpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl LolaLink for SocketLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.close();

        let stream = match &self.endpoint {
            LolaEndpoint::Unix(path) => Stream::Unix(UnixStream::connect(path)?),
            LolaEndpoint::Tcp(addr) => {
                let s = TcpStream::connect(addr.as_str())?;
                s.set_nodelay(true)?;
                Stream::Tcp(s)
            },
        };
        stream.set_read_timeout(self.receive_timeout)?;

        debug!("Socket connected to {}", self.endpoint);
        self.stream = Some(stream);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let stream = self.stream.as_mut().ok_or(LinkError::NotConnected)?;
        match stream.read(buf) {
            Ok(0) => Err(LinkError::Closed),
            Ok(n) => {
                trace!("Received {} bytes", n);
                Ok(n)
            },
            Err(e) => Err(LinkError::from_io(e)),
        }
    }

    fn send(&mut self, pkt: &[u8]) -> Result<(), LinkError> {
        let stream = self.stream.as_mut().ok_or(LinkError::NotConnected)?;
        stream.write_all(pkt).map_err(LinkError::from_io)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.shutdown();
        }
    }
}

impl Drop for SocketLink {
    fn drop(&mut self) {
        self.close();
    }
}
