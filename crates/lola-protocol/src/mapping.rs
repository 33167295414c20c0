//! 通道映射
//!
//! 每个 chain 名称对应一个有序槽位列表，列表长度必须与线格式中该 chain 的数组长度一致。
//! `None` 表示该位置在存储中没有对应槽位（解码时跳过，编码时写 0）。

use crate::ids::{NUM_JOINTS, actuator, sensor};

/// 单个槽位，`None` 表示不存储
pub type Slot = Option<usize>;

/// chain 名称常量
pub mod chain {
    pub const ACCELEROMETER: &str = "Accelerometer";
    pub const ANGLES: &str = "Angles";
    pub const BATTERY: &str = "Battery";
    pub const CURRENT: &str = "Current";
    pub const FSR: &str = "FSR";
    pub const GYROSCOPE: &str = "Gyroscope";
    pub const POSITION: &str = "Position";
    pub const SONAR: &str = "Sonar";
    pub const STATUS: &str = "Status";
    pub const STIFFNESS: &str = "Stiffness";
    pub const TEMPERATURE: &str = "Temperature";
    pub const TOUCH: &str = "Touch";
    pub const ROBOT_CONFIG: &str = "RobotConfig";

    pub const CHEST: &str = "Chest";
    pub const L_EAR: &str = "LEar";
    pub const R_EAR: &str = "REar";
    pub const L_EYE: &str = "LEye";
    pub const R_EYE: &str = "REye";
    pub const L_FOOT: &str = "LFoot";
    pub const R_FOOT: &str = "RFoot";
    pub const SKULL: &str = "Skull";
}

/// 一个命名 chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub name: &'static str,
    pub slots: Vec<Slot>,
}

impl Chain {
    fn new(name: &'static str, slots: Vec<Slot>) -> Self {
        Self { name, slots }
    }

    /// 连续槽位 `start..start + len`
    fn contiguous(name: &'static str, start: usize, len: usize) -> Self {
        Self::new(name, (start..start + len).map(Some).collect())
    }

    /// 全部为 `None` 的 chain
    fn unmapped(name: &'static str, len: usize) -> Self {
        Self::new(name, vec![None; len])
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }
}

/// 通道映射（只读）
///
/// chain 的顺序即编码时的写出顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    chains: Vec<Chain>,
}

impl ChannelMap {
    pub fn new(chains: Vec<Chain>) -> Self {
        Self { chains }
    }

    /// LoLA 传感器帧映射
    pub fn sensors() -> Self {
        Self::new(vec![
            Chain::contiguous(chain::ACCELEROMETER, sensor::ACC_X, 3),
            Chain::contiguous(chain::ANGLES, sensor::ANGLE_X, 2),
            // charge, status, current, temperature
            Chain::new(
                chain::BATTERY,
                vec![
                    Some(sensor::BATTERY_CHARGE),
                    None,
                    Some(sensor::BATTERY_CURRENT),
                    Some(sensor::BATTERY_TEMPERATURE),
                ],
            ),
            Chain::contiguous(chain::CURRENT, sensor::CURRENT, NUM_JOINTS),
            Chain::contiguous(chain::FSR, sensor::L_FSR_FRONT_LEFT, 8),
            Chain::contiguous(chain::GYROSCOPE, sensor::GYRO_X, 3),
            Chain::contiguous(chain::POSITION, sensor::POSITION, NUM_JOINTS),
            Chain::contiguous(chain::SONAR, sensor::L_SONAR, 2),
            Chain::contiguous(chain::STATUS, sensor::STATUS, NUM_JOINTS),
            Chain::unmapped(chain::STIFFNESS, NUM_JOINTS),
            Chain::contiguous(chain::TEMPERATURE, sensor::TEMPERATURE, NUM_JOINTS),
            Chain::contiguous(chain::TOUCH, sensor::CHEST_BUTTON, 14),
            // BodyId, BodyVersion, FullHeadId, HeadVersion
            Chain::unmapped(chain::ROBOT_CONFIG, 4),
        ])
    }

    /// LoLA 执行器帧映射
    pub fn actuators() -> Self {
        Self::new(vec![
            Chain::contiguous(chain::POSITION, actuator::POSITION, NUM_JOINTS),
            Chain::contiguous(chain::STIFFNESS, actuator::STIFFNESS, NUM_JOINTS),
            Chain::contiguous(chain::R_EAR, actuator::R_EAR, actuator::EAR_LEDS),
            Chain::contiguous(chain::L_EAR, actuator::L_EAR, actuator::EAR_LEDS),
            Chain::contiguous(chain::CHEST, actuator::CHEST_RED, 3),
            Chain::contiguous(chain::L_EYE, actuator::L_EYE, actuator::EYE_LEDS),
            Chain::contiguous(chain::R_EYE, actuator::R_EYE, actuator::EYE_LEDS),
            Chain::contiguous(chain::L_FOOT, actuator::L_FOOT_RED, 3),
            Chain::contiguous(chain::R_FOOT, actuator::R_FOOT_RED, 3),
            Chain::contiguous(chain::SKULL, actuator::SKULL, actuator::SKULL_LEDS),
            Chain::contiguous(chain::SONAR, actuator::L_SONAR, 2),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// chain 长度（未定义的 chain 返回 `None`）
    pub fn size(&self, name: &str) -> Option<usize> {
        self.get(name).map(Chain::size)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
