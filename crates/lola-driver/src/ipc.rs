//! 与上游（前端）进程交换数据
//!
//! 两个方向独立：
//!
//! - 传感器：桥接是唯一写者，每个周期发布一条 [`SensorMessage`]，读者总是看到最新一条
//! - 执行器：上游写入最新的 [`ActuatorMessage`]，桥接在每个周期取走它，最多等待一个超时
//!
//! [`InProcessTransport`] 是进程内实现：传感器用 `ArcSwapOption` 无锁发布，
//! 执行器用单槽邮箱（`Mutex<Option<_>>` + `Condvar`），新消息覆盖未取走的旧消息。

use crate::identity::RobotIdentity;
use arc_swap::ArcSwapOption;
use lola_protocol::{ActuatorBank, SensorBank};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 桥接版本号（随传感器消息发布）
pub const BACKEND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 每个周期发布的传感器消息
#[derive(Debug, Clone)]
pub struct SensorMessage {
    /// 发布序号，每次发布后递增
    pub tick: u64,
    /// 系统时间（微秒）
    pub timestamp_us: u64,
    /// 收到 LoLA 帧的时刻（微秒）
    pub lola_timestamp_us: u64,
    /// 每次连接解析一次，各周期共享
    pub robot: Arc<RobotIdentity>,
    pub backend_version: &'static str,
    /// 上游当前是否被判定为存活
    pub connected: bool,
    pub simulator: bool,
    pub sensors: SensorBank,
}

/// 上游产生的执行器消息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorMessage {
    /// 上游计数器，用于存活检测
    pub tick: u64,
    pub actuators: ActuatorBank,
}

/// 进程间传输接口
pub trait IpcTransport: Send {
    fn publish_sensors(&mut self, msg: SensorMessage);

    /// 取走最新的执行器消息；`timeout` 内没有新消息则返回 `None`
    fn fetch_actuators(&mut self, timeout: Duration) -> Option<ActuatorMessage>;
}

struct Shared {
    sensors: ArcSwapOption<SensorMessage>,
    actuators: Mutex<Option<ActuatorMessage>>,
    actuators_ready: Condvar,
}

/// 进程内传输（桥接端）
pub struct InProcessTransport {
    shared: Arc<Shared>,
}

impl InProcessTransport {
    /// 创建桥接端和上游端
    pub fn new() -> (Self, FrontendEndpoint) {
        let shared = Arc::new(Shared {
            sensors: ArcSwapOption::empty(),
            actuators: Mutex::new(None),
            actuators_ready: Condvar::new(),
        });
        (
            Self {
                shared: shared.clone(),
            },
            FrontendEndpoint { shared },
        )
    }
}

impl IpcTransport for InProcessTransport {
    fn publish_sensors(&mut self, msg: SensorMessage) {
        self.shared.sensors.store(Some(Arc::new(msg)));
    }

    fn fetch_actuators(&mut self, timeout: Duration) -> Option<ActuatorMessage> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.actuators.lock();
        while slot.is_none() {
            if self
                .shared
                .actuators_ready
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                break;
            }
        }
        slot.take()
    }
}

/// 进程内传输（上游端）
#[derive(Clone)]
pub struct FrontendEndpoint {
    shared: Arc<Shared>,
}

impl FrontendEndpoint {
    /// 最新的传感器消息（无锁读取）
    pub fn latest_sensors(&self) -> Option<Arc<SensorMessage>> {
        self.shared.sensors.load_full()
    }

    /// 提交执行器消息，覆盖尚未被取走的旧消息
    pub fn submit_actuators(&self, msg: ActuatorMessage) {
        *self.shared.actuators.lock() = Some(msg);
        self.shared.actuators_ready.notify_one();
    }
}
