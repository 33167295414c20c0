//! # LoLA Driver
//!
//! NAO 机器人 LoLA 实时桥接：在硬件服务（LoLA）和上游控制进程之间转发传感器/执行器数据，
//! 并在每个周期执行必须实时完成的安全逻辑。
//!
//! ## 模块
//!
//! - `bridge`: 主循环（[`Bridge`] / [`BridgeBuilder`]）
//! - `gyro`: 陀螺仪零偏标定与轴向修正
//! - `liveness`: 上游存活检测（滞回计数）
//! - `idle`: 上游未连接时的 LED 与姿态回退
//! - `sit`: 坐下动作
//! - `power`: 电量警告与关机状态机
//! - `button`: 胸口按键点击分类与动作分派
//! - `ipc`: 与上游交换传感器/执行器消息
//! - `process` / `speech` / `system`: 子进程、语音、系统命令
//! - `config` / `identity` / `metrics`: 配置、机器人身份、运行指标
//!
//! ## 使用
//!
//! ```no_run
//! use lola_driver::{BridgeBuilder, BridgeConfig};
//! use lola_link::{LolaEndpoint, SocketLink};
//!
//! let config = BridgeConfig::default();
//! let link = SocketLink::new(LolaEndpoint::default());
//! let mut bridge = BridgeBuilder::new(link, config).build().unwrap();
//! bridge.run().unwrap();
//! ```

pub mod bridge;
pub mod button;
pub mod config;
mod error;
pub mod gyro;
pub mod identity;
pub mod idle;
pub mod ipc;
pub mod liveness;
mod metrics;
pub mod power;
pub mod process;
pub mod sit;
pub mod speech;
pub mod system;

pub use bridge::{Bridge, BridgeBuilder, BridgeExit};
pub use button::{ButtonAction, ButtonDispatcher, ChestButtonClassifier, ClickClassifier, ClickKind};
pub use config::{BridgeConfig, ConfigError};
pub use error::DriverError;
pub use gyro::GyroCalibrator;
pub use identity::{GyroGainTable, RobotIdentity, RobotName, RobotRegistry, SIMULATOR_HEAD_ID};
pub use idle::{IdleFallback, IdleInputs};
pub use ipc::{
    ActuatorMessage, BACKEND_VERSION, FrontendEndpoint, InProcessTransport, IpcTransport,
    SensorMessage,
};
pub use liveness::{LivenessMonitor, LivenessTransition};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use power::{PowerAction, PowerManager, PowerState};
pub use process::{DetachedProcesses, Frontend, ProcessControl};
pub use sit::{LinearSitPose, SitPose};
pub use speech::{Announcer, FifoSpeech, NullSpeech, Speech};
pub use system::{ShellSystem, SystemControl};
