//! 坐下动作
//!
//! 没有上游驱动时，机器人从当前姿态线性插值到坐姿，然后放松关节。

use lola_protocol::{ActuatorBank, Joint, NUM_JOINTS, SensorBank, actuator};

/// 坐姿关节角（rad，LoLA 关节顺序）
pub const SIT_STANCE: [f32; NUM_JOINTS] = [
    0.0,   // HeadYaw
    0.0,   // HeadPitch
    0.89,  // LShoulderPitch
    0.06,  // LShoulderRoll
    0.26,  // LElbowYaw
    -0.62, // LElbowRoll
    -1.57, // LWristYaw
    0.0,   // LHipYawPitch
    0.0,   // LHipRoll
    -0.87, // LHipPitch
    2.11,  // LKneePitch
    -1.18, // LAnklePitch
    0.0,   // LAnkleRoll
    0.0,   // RHipRoll
    -0.87, // RHipPitch
    2.11,  // RKneePitch
    -1.18, // RAnklePitch
    0.0,   // RAnkleRoll
    0.89,  // RShoulderPitch
    -0.06, // RShoulderRoll
    -0.26, // RElbowYaw
    0.62,  // RElbowRoll
    1.57,  // RWristYaw
    0.0,   // LHand
    0.0,   // RHand
];

/// 坐下动作接口
///
/// 每个周期调用一次 `step`，返回 `true` 表示动作已完成。
pub trait SitPose: Send {
    fn step(&mut self, sensors: &SensorBank, actuators: &mut ActuatorBank) -> bool;

    /// 放弃进行中的动作，下次 `step` 从当前姿态重新开始
    fn reset(&mut self);
}

/// 线性插值坐下
#[derive(Debug, Clone)]
pub struct LinearSitPose {
    duration_ms: u32,
    cycle_ms: u32,
    stiffness: f32,
    hip_stiffness: f32,
    target: [f32; NUM_JOINTS],
    from: [f32; NUM_JOINTS],
    time_ms: u32,
}

impl LinearSitPose {
    pub fn new() -> Self {
        Self {
            duration_ms: 1000,
            cycle_ms: 10,
            stiffness: 0.6,
            hip_stiffness: 0.15,
            target: SIT_STANCE,
            from: [0.0; NUM_JOINTS],
            time_ms: 0,
        }
    }

    /// 动作是否正在进行
    pub fn in_progress(&self) -> bool {
        self.time_ms > 0
    }
}

impl Default for LinearSitPose {
    fn default() -> Self {
        Self::new()
    }
}

impl SitPose for LinearSitPose {
    fn step(&mut self, sensors: &SensorBank, actuators: &mut ActuatorBank) -> bool {
        if self.time_ms == 0 {
            actuators.joint_stiffness_mut().fill(self.stiffness);
            self.from.copy_from_slice(sensors.joint_positions());
        }

        let alpha = (self.time_ms as f32 / self.duration_ms as f32).min(1.0);
        for (i, p) in actuators.joint_positions_mut().iter_mut().enumerate() {
            *p = self.from[i] + (self.target[i] - self.from[i]) * alpha;
        }

        if self.time_ms >= self.duration_ms {
            self.time_ms = 0;

            actuators.joint_stiffness_mut().fill(-1.0);
            actuators[actuator::stiffness(Joint::LHipPitch)] = self.hip_stiffness;
            actuators[actuator::stiffness(Joint::RHipPitch)] = self.hip_stiffness;
            actuators
                .joint_positions_mut()
                .copy_from_slice(sensors.joint_positions());
            return true;
        }

        self.time_ms += self.cycle_ms;
        false
    }

    fn reset(&mut self) {
        self.time_ms = 0;
    }
}
