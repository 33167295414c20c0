//! 扁平传感器/执行器存储
//!
//! 每个槽位一个 `f32`，槽位下标见 [`crate::ids`]。

use crate::ids::{NUM_JOINTS, actuator, sensor};
use std::ops::{Index, IndexMut, Range};

/// 定长 `f32` 数组
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bank<const N: usize>([f32; N]);

/// 传感器存储
pub type SensorBank = Bank<{ sensor::COUNT }>;

/// 执行器存储
pub type ActuatorBank = Bank<{ actuator::COUNT }>;

impl<const N: usize> Bank<N> {
    /// 槽位数量
    pub const LEN: usize = N;

    /// 全零存储
    pub const fn zeroed() -> Self {
        Self([0.0; N])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    /// 将一段连续槽位设为同一个值
    pub fn fill(&mut self, range: Range<usize>, value: f32) {
        self.0[range].fill(value);
    }

    pub fn get(&self, slot: usize) -> Option<f32> {
        self.0.get(slot).copied()
    }
}

impl<const N: usize> Default for Bank<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Index<usize> for Bank<N> {
    type Output = f32;

    fn index(&self, slot: usize) -> &f32 {
        &self.0[slot]
    }
}

impl<const N: usize> IndexMut<usize> for Bank<N> {
    fn index_mut(&mut self, slot: usize) -> &mut f32 {
        &mut self.0[slot]
    }
}

impl<const N: usize> Index<Range<usize>> for Bank<N> {
    type Output = [f32];

    fn index(&self, range: Range<usize>) -> &[f32] {
        &self.0[range]
    }
}

impl<const N: usize> IndexMut<Range<usize>> for Bank<N> {
    fn index_mut(&mut self, range: Range<usize>) -> &mut [f32] {
        &mut self.0[range]
    }
}

impl SensorBank {
    pub fn gyro(&self) -> [f32; 3] {
        [
            self.0[sensor::GYRO_X],
            self.0[sensor::GYRO_Y],
            self.0[sensor::GYRO_Z],
        ]
    }

    pub fn set_gyro(&mut self, gyro: [f32; 3]) {
        self.0[sensor::GYRO_X..=sensor::GYRO_Z].copy_from_slice(&gyro);
    }

    pub fn accel(&self) -> [f32; 3] {
        [
            self.0[sensor::ACC_X],
            self.0[sensor::ACC_Y],
            self.0[sensor::ACC_Z],
        ]
    }

    /// 躯干倾角 (X, Y)，单位 rad
    pub fn angles(&self) -> [f32; 2] {
        [self.0[sensor::ANGLE_X], self.0[sensor::ANGLE_Y]]
    }

    pub fn battery_charge(&self) -> f32 {
        self.0[sensor::BATTERY_CHARGE]
    }

    /// 电池电流（负值表示放电）
    pub fn battery_current(&self) -> f32 {
        self.0[sensor::BATTERY_CURRENT]
    }

    pub fn chest_button(&self) -> f32 {
        self.0[sensor::CHEST_BUTTON]
    }

    /// 关节测量位置
    pub fn joint_positions(&self) -> &[f32] {
        &self.0[sensor::POSITION..sensor::POSITION + NUM_JOINTS]
    }

    /// 重新计算左右脚压力总和
    ///
    /// 总和不在线格式中，每次解码后都要覆盖旧值。
    pub fn update_fsr_totals(&mut self) {
        self.0[sensor::L_FSR_TOTAL] = self.0[sensor::L_FSR_FRONT_LEFT..=sensor::L_FSR_REAR_RIGHT]
            .iter()
            .sum();
        self.0[sensor::R_FSR_TOTAL] = self.0[sensor::R_FSR_FRONT_LEFT..=sensor::R_FSR_REAR_RIGHT]
            .iter()
            .sum();
    }
}

impl ActuatorBank {
    pub fn joint_positions_mut(&mut self) -> &mut [f32] {
        &mut self.0[actuator::POSITION..actuator::POSITION + NUM_JOINTS]
    }

    pub fn joint_stiffness_mut(&mut self) -> &mut [f32] {
        &mut self.0[actuator::STIFFNESS..actuator::STIFFNESS + NUM_JOINTS]
    }

    pub fn leds_mut(&mut self) -> &mut [f32] {
        &mut self.0[actuator::LEDS]
    }
}
