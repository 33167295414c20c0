//! # LoLA Protocol
//!
//! NAO 硬件服务（LoLA）的帧协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `ids`: 关节名称、传感器/执行器槽位布局
//! - `bank`: 扁平传感器/执行器存储（`SensorBank` / `ActuatorBank`）
//! - `mapping`: 通道映射（chain 名称 → 槽位列表）
//! - `codec`: msgpack 帧编解码
//!
//! ## 线格式
//!
//! 每个周期 LoLA 发送一个 msgpack map：键为 chain 名称，值为数值数组。
//! 执行器帧使用相同的结构回写，其中 `Sonar` chain 以布尔值编码。

pub mod bank;
pub mod codec;
mod error;
pub mod ids;
pub mod mapping;

// 重新导出常用类型
pub use bank::{ActuatorBank, Bank, SensorBank};
pub use codec::{
    FrameDecoder, FrameEncoder, LOLA_PKT_SIZE, MAX_PACKET_SIZE, RobotConfig, encode_sensor_frame,
    stiffness_request,
};
pub use error::ProtocolError;
pub use ids::{Joint, NUM_JOINTS, actuator, sensor};
pub use mapping::{Chain, ChannelMap, Slot, chain};
