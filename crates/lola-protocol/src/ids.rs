//! 关节名称与槽位布局
//!
//! 传感器和执行器都使用扁平的 `f32` 数组存储，本模块定义每个槽位的下标。
//! 关节顺序与 LoLA 线格式中的关节数组顺序一致。

/// 关节数量（LoLA 关节数组长度）
pub const NUM_JOINTS: usize = 25;

/// NAO 关节（LoLA 顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Joint {
    HeadYaw = 0,
    HeadPitch,
    LShoulderPitch,
    LShoulderRoll,
    LElbowYaw,
    LElbowRoll,
    LWristYaw,
    LHipYawPitch,
    LHipRoll,
    LHipPitch,
    LKneePitch,
    LAnklePitch,
    LAnkleRoll,
    RHipRoll,
    RHipPitch,
    RKneePitch,
    RAnklePitch,
    RAnkleRoll,
    RShoulderPitch,
    RShoulderRoll,
    RElbowYaw,
    RElbowRoll,
    RWristYaw,
    LHand,
    RHand,
}

impl Joint {
    /// 所有关节（LoLA 顺序）
    pub const ALL: [Joint; NUM_JOINTS] = [
        Joint::HeadYaw,
        Joint::HeadPitch,
        Joint::LShoulderPitch,
        Joint::LShoulderRoll,
        Joint::LElbowYaw,
        Joint::LElbowRoll,
        Joint::LWristYaw,
        Joint::LHipYawPitch,
        Joint::LHipRoll,
        Joint::LHipPitch,
        Joint::LKneePitch,
        Joint::LAnklePitch,
        Joint::LAnkleRoll,
        Joint::RHipRoll,
        Joint::RHipPitch,
        Joint::RKneePitch,
        Joint::RAnklePitch,
        Joint::RAnkleRoll,
        Joint::RShoulderPitch,
        Joint::RShoulderRoll,
        Joint::RElbowYaw,
        Joint::RElbowRoll,
        Joint::RWristYaw,
        Joint::LHand,
        Joint::RHand,
    ];

    /// 关节在 LoLA 关节数组中的下标
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 传感器槽位
pub mod sensor {
    use super::{Joint, NUM_JOINTS};

    pub const POSITION: usize = 0;
    pub const CURRENT: usize = POSITION + NUM_JOINTS;
    pub const TEMPERATURE: usize = CURRENT + NUM_JOINTS;
    pub const STATUS: usize = TEMPERATURE + NUM_JOINTS;

    pub const ACC_X: usize = STATUS + NUM_JOINTS;
    pub const ACC_Y: usize = ACC_X + 1;
    pub const ACC_Z: usize = ACC_X + 2;

    pub const GYRO_X: usize = ACC_Z + 1;
    pub const GYRO_Y: usize = GYRO_X + 1;
    pub const GYRO_Z: usize = GYRO_X + 2;

    // LoLA 不提供 Z 轴角度
    pub const ANGLE_X: usize = GYRO_Z + 1;
    pub const ANGLE_Y: usize = ANGLE_X + 1;

    // 电池状态字（status）没有对应槽位
    pub const BATTERY_CHARGE: usize = ANGLE_Y + 1;
    pub const BATTERY_CURRENT: usize = BATTERY_CHARGE + 1;
    pub const BATTERY_TEMPERATURE: usize = BATTERY_CHARGE + 2;

    pub const L_FSR_FRONT_LEFT: usize = BATTERY_TEMPERATURE + 1;
    pub const L_FSR_FRONT_RIGHT: usize = L_FSR_FRONT_LEFT + 1;
    pub const L_FSR_REAR_LEFT: usize = L_FSR_FRONT_LEFT + 2;
    pub const L_FSR_REAR_RIGHT: usize = L_FSR_FRONT_LEFT + 3;
    pub const R_FSR_FRONT_LEFT: usize = L_FSR_REAR_RIGHT + 1;
    pub const R_FSR_FRONT_RIGHT: usize = R_FSR_FRONT_LEFT + 1;
    pub const R_FSR_REAR_LEFT: usize = R_FSR_FRONT_LEFT + 2;
    pub const R_FSR_REAR_RIGHT: usize = R_FSR_FRONT_LEFT + 3;
    /// 左脚压力总和（LoLA 不提供，每个周期由四个子传感器求和）
    pub const L_FSR_TOTAL: usize = R_FSR_REAR_RIGHT + 1;
    /// 右脚压力总和
    pub const R_FSR_TOTAL: usize = L_FSR_TOTAL + 1;

    pub const L_SONAR: usize = R_FSR_TOTAL + 1;
    pub const R_SONAR: usize = L_SONAR + 1;

    pub const CHEST_BUTTON: usize = R_SONAR + 1;
    pub const HEAD_TOUCH_FRONT: usize = CHEST_BUTTON + 1;
    pub const HEAD_TOUCH_MIDDLE: usize = CHEST_BUTTON + 2;
    pub const HEAD_TOUCH_REAR: usize = CHEST_BUTTON + 3;
    pub const L_BUMPER_LEFT: usize = CHEST_BUTTON + 4;
    pub const L_BUMPER_RIGHT: usize = CHEST_BUTTON + 5;
    pub const L_HAND_TOUCH_BACK: usize = CHEST_BUTTON + 6;
    pub const L_HAND_TOUCH_LEFT: usize = CHEST_BUTTON + 7;
    pub const L_HAND_TOUCH_RIGHT: usize = CHEST_BUTTON + 8;
    pub const R_BUMPER_LEFT: usize = CHEST_BUTTON + 9;
    pub const R_BUMPER_RIGHT: usize = CHEST_BUTTON + 10;
    pub const R_HAND_TOUCH_BACK: usize = CHEST_BUTTON + 11;
    pub const R_HAND_TOUCH_LEFT: usize = CHEST_BUTTON + 12;
    pub const R_HAND_TOUCH_RIGHT: usize = CHEST_BUTTON + 13;

    /// 传感器槽位总数
    pub const COUNT: usize = R_HAND_TOUCH_RIGHT + 1;

    pub const fn position(joint: Joint) -> usize {
        POSITION + joint.index()
    }

    pub const fn current(joint: Joint) -> usize {
        CURRENT + joint.index()
    }

    pub const fn temperature(joint: Joint) -> usize {
        TEMPERATURE + joint.index()
    }

    pub const fn status(joint: Joint) -> usize {
        STATUS + joint.index()
    }
}

/// 执行器槽位
pub mod actuator {
    use super::{Joint, NUM_JOINTS};
    use std::ops::Range;

    pub const POSITION: usize = 0;
    pub const STIFFNESS: usize = POSITION + NUM_JOINTS;

    pub const CHEST_RED: usize = STIFFNESS + NUM_JOINTS;
    pub const CHEST_GREEN: usize = CHEST_RED + 1;
    pub const CHEST_BLUE: usize = CHEST_RED + 2;

    /// 每只耳朵的 LED 数量（0°, 36°, ..., 324°）
    pub const EAR_LEDS: usize = 10;
    pub const L_EAR: usize = CHEST_BLUE + 1;
    pub const R_EAR: usize = L_EAR + EAR_LEDS;

    /// 每只眼睛的 LED 段数
    pub const EYE_SEGMENTS: usize = 8;
    /// 每只眼睛的通道数（8×R, 8×G, 8×B）
    pub const EYE_LEDS: usize = 3 * EYE_SEGMENTS;
    pub const L_EYE: usize = R_EAR + EAR_LEDS;
    pub const R_EYE: usize = L_EYE + EYE_LEDS;

    pub const L_FOOT_RED: usize = R_EYE + EYE_LEDS;
    pub const L_FOOT_GREEN: usize = L_FOOT_RED + 1;
    pub const L_FOOT_BLUE: usize = L_FOOT_RED + 2;
    pub const R_FOOT_RED: usize = L_FOOT_BLUE + 1;
    pub const R_FOOT_GREEN: usize = R_FOOT_RED + 1;
    pub const R_FOOT_BLUE: usize = R_FOOT_RED + 2;

    /// 头顶 LED 数量
    pub const SKULL_LEDS: usize = 12;
    pub const SKULL: usize = R_FOOT_BLUE + 1;

    pub const L_SONAR: usize = SKULL + SKULL_LEDS;
    pub const R_SONAR: usize = L_SONAR + 1;

    /// 执行器槽位总数
    pub const COUNT: usize = R_SONAR + 1;

    /// 所有 LED 通道（连续区间，从胸口到头顶）
    pub const LEDS: Range<usize> = CHEST_RED..L_SONAR;

    pub const fn position(joint: Joint) -> usize {
        POSITION + joint.index()
    }

    pub const fn stiffness(joint: Joint) -> usize {
        STIFFNESS + joint.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_order_matches_index() {
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
    }

    #[test]
    fn test_sensor_layout_is_dense() {
        assert_eq!(sensor::ACC_X, 4 * NUM_JOINTS);
        assert_eq!(sensor::CHEST_BUTTON + 14, sensor::COUNT);
        assert_eq!(sensor::position(Joint::RHand), NUM_JOINTS - 1);
        assert_eq!(sensor::status(Joint::HeadYaw), sensor::STATUS);
    }

    #[test]
    fn test_actuator_layout() {
        assert_eq!(actuator::stiffness(Joint::HeadYaw), NUM_JOINTS);
        assert_eq!(actuator::LEDS.start, 2 * NUM_JOINTS);
        assert_eq!(actuator::LEDS.end, actuator::L_SONAR);
        // 3 (胸口) + 2×10 (耳朵) + 2×24 (眼睛) + 2×3 (脚) + 12 (头顶)
        assert_eq!(actuator::LEDS.len(), 3 + 20 + 48 + 6 + 12);
        assert_eq!(actuator::COUNT, actuator::R_SONAR + 1);
    }
}
