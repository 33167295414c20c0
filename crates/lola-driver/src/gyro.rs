//! 陀螺仪零偏标定与轴向修正
//!
//! LoLA 每两帧才提供一个新的陀螺仪样本（中间帧重复上一个值），
//! 因此只有与上一个样本不同的值才参与标定。
//!
//! 每帧处理流程：
//!
//! 1. 仿真器：原样透传
//! 2. 首次使用时按身体序列号查找增益，找不到则使用单位增益并记录错误
//! 3. `delta = prev - current`，为零向量表示重复样本，跳过标定记账
//! 4. 新样本：未标定时，若 `‖delta‖² < threshold` 则累加 `current / N`，
//!    连续 N 个稳定样本后完成标定；否则清零重新开始
//! 5. 已标定：减去零偏
//! 6. 加速度计 Y 轴、陀螺仪 Z 轴取反（安装方向），陀螺仪各轴乘以增益

use crate::config::GyroConfig;
use crate::identity::{GyroGainTable, RobotIdentity};
use lola_protocol::{SensorBank, sensor};
use tracing::{error, info};

const UNITY_GAIN: [f32; 3] = [1.0, 1.0, 1.0];

/// 陀螺仪标定器
#[derive(Debug, Clone)]
pub struct GyroCalibrator {
    stable_threshold: f32,
    samples: u32,
    gains: GyroGainTable,
    gain: Option<[f32; 3]>,
    prev: [f32; 3],
    offset: [f32; 3],
    count: u32,
    calibrated: bool,
}

impl GyroCalibrator {
    pub fn new(config: &GyroConfig, gains: GyroGainTable) -> Self {
        Self {
            stable_threshold: config.stable_threshold,
            samples: config.calibration_samples.max(1),
            gains,
            gain: None,
            prev: [0.0; 3],
            offset: [0.0; 3],
            count: 0,
            calibrated: false,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn offset(&self) -> [f32; 3] {
        self.offset
    }

    /// 当前连续稳定样本数
    pub fn stable_count(&self) -> u32 {
        self.count
    }

    /// 已解析的增益（首次处理非仿真帧之前为 `None`）
    pub fn gain(&self) -> Option<[f32; 3]> {
        self.gain
    }

    fn resolve_gain(&mut self, body_serial: &str) -> [f32; 3] {
        if let Some(gain) = self.gain {
            return gain;
        }
        let gain = match self.gains.get(body_serial) {
            Some(gain) => {
                info!("Using gyro gain calibration: {:?}", gain);
                gain
            },
            None => {
                error!("No gyro calibration found for body '{}', using unity gain", body_serial);
                UNITY_GAIN
            },
        };
        self.gain = Some(gain);
        gain
    }

    /// 处理一帧：更新标定状态，并把修正后的值写回 `bank`
    pub fn apply(&mut self, bank: &mut SensorBank, identity: &RobotIdentity) {
        if identity.simulator {
            return;
        }

        let gain = self.resolve_gain(&identity.body_serial);
        let mut g = bank.gyro();

        let d = [self.prev[0] - g[0], self.prev[1] - g[1], self.prev[2] - g[2]];
        if d != [0.0; 3] {
            self.prev = g;
            if !self.calibrated {
                self.track(g, d);
            }
        }

        if self.calibrated {
            for (v, o) in g.iter_mut().zip(self.offset) {
                *v -= o;
            }
        }

        bank[sensor::ACC_Y] = -bank[sensor::ACC_Y];
        g[2] = -g[2];
        for (v, k) in g.iter_mut().zip(gain) {
            *v *= k;
        }
        bank.set_gyro(g);
    }

    fn track(&mut self, g: [f32; 3], d: [f32; 3]) {
        let norm2: f32 = d.iter().map(|x| x * x).sum();
        if norm2 < self.stable_threshold {
            let n = self.samples as f32;
            for (o, v) in self.offset.iter_mut().zip(g) {
                *o += v / n;
            }
            self.count += 1;
            if self.count >= self.samples {
                self.calibrated = true;
                info!("Gyro offset calibrated: {:?}", self.offset);
            }
        } else {
            self.count = 0;
            self.offset = [0.0; 3];
        }
    }
}
