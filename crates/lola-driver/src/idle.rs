//! 空闲回退动作
//!
//! 上游未连接时由桥接自己产生执行器输出：
//!
//! - 头顶 LED 呼吸灯（陀螺仪标定完成后开始）
//! - 耳朵 LED 显示电量（关机过程中全部熄灭）
//! - 胸口 LED：充电时绿色，放电时熄灭
//! - 眼睛 LED：常亮，请求关机后熄灭
//! - 姿态：躯干接近直立时执行坐下动作，否则放松所有关节

use crate::config::IdleConfig;
use crate::sit::SitPose;
use lola_protocol::{ActuatorBank, SensorBank, actuator};

/// 呼吸灯亮度表
const GAMMA: [f32; 10] = [0.0, 0.01, 0.05, 0.15, 0.3, 0.45, 0.6, 0.8, 1.0, 1.0];

/// 空闲周期的外部状态
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInputs {
    /// 陀螺仪是否已完成标定
    pub calibrated: bool,
    /// 是否已请求关机
    pub shutdown_requested: bool,
}

/// 空闲回退动作生成器
#[derive(Debug, Clone)]
pub struct IdleFallback {
    upright_limit: f32,
    blink_period: u32,
    cycle: u32,
    index: usize,
    rising: bool,
}

impl IdleFallback {
    pub fn new(config: &IdleConfig) -> Self {
        Self {
            upright_limit: config.upright_limit,
            blink_period: config.blink_period_cycles.max(1),
            cycle: 0,
            index: 0,
            rising: true,
        }
    }

    /// 当前呼吸灯亮度
    pub fn brightness(&self) -> f32 {
        GAMMA[self.index]
    }

    /// 生成一个周期的空闲输出
    ///
    /// `sit_completed` 在坐下完成时置位，躯干倾斜时清除。
    pub fn step(
        &mut self,
        sensors: &SensorBank,
        actuators: &mut ActuatorBank,
        inputs: IdleInputs,
        sit: &mut dyn SitPose,
        sit_completed: &mut bool,
    ) {
        self.set_leds(sensors, actuators, inputs);

        let [x, y] = sensors.angles();
        if x.abs().max(y.abs()) < self.upright_limit {
            if !*sit_completed {
                *sit_completed = sit.step(sensors, actuators);
            }
        } else {
            actuators.joint_stiffness_mut().fill(0.0);
            actuators
                .joint_positions_mut()
                .copy_from_slice(sensors.joint_positions());
            sit.reset();
            *sit_completed = false;
        }
    }

    fn set_leds(&mut self, sensors: &SensorBank, actuators: &mut ActuatorBank, inputs: IdleInputs) {
        actuators.fill(
            actuator::SKULL..actuator::SKULL + actuator::SKULL_LEDS,
            self.brightness(),
        );
        if inputs.calibrated {
            self.advance();
        }

        // === 胸口：充电绿色，放电熄灭 ===
        let green = if sensors.battery_current() > 0.0 { 0.25 } else { 0.0 };
        actuators[actuator::CHEST_RED] = 0.0;
        actuators[actuator::CHEST_GREEN] = green;
        actuators[actuator::CHEST_BLUE] = 0.0;

        // === 眼睛 ===
        let eyes = if inputs.shutdown_requested { 0.0 } else { 1.0 };
        actuators.fill(actuator::L_EYE..actuator::R_EYE + actuator::EYE_LEDS, eyes);

        // === 耳朵：电量条 ===
        let charge = sensors.battery_charge();
        let n = actuator::EAR_LEDS;
        for i in 0..n {
            let lit = !inputs.shutdown_requested && charge > i as f32 / n as f32;
            let v = if lit { 1.0 } else { 0.0 };
            actuators[actuator::L_EAR + i] = v;
            actuators[actuator::R_EAR + i] = v;
        }
    }

    fn advance(&mut self) {
        self.cycle += 1;
        if self.cycle < self.blink_period {
            return;
        }
        self.cycle = 0;

        if self.rising {
            if self.index + 1 < GAMMA.len() {
                self.index += 1;
            } else {
                self.rising = false;
                self.index -= 1;
            }
        } else if self.index > 0 {
            self.index -= 1;
        } else {
            self.rising = true;
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdleConfig;
    use crate::sit::LinearSitPose;
    use lola_protocol::{Joint, sensor};

    struct CountingSit {
        steps: usize,
        done_after: usize,
        resets: usize,
    }

    impl SitPose for CountingSit {
        fn step(&mut self, _: &SensorBank, _: &mut ActuatorBank) -> bool {
            self.steps += 1;
            self.steps >= self.done_after
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn run(idle: &mut IdleFallback, sensors: &SensorBank, inputs: IdleInputs) -> ActuatorBank {
        let mut actuators = ActuatorBank::default();
        let mut sit = LinearSitPose::new();
        let mut done = false;
        idle.step(sensors, &mut actuators, inputs, &mut sit, &mut done);
        actuators
    }

    #[test]
    fn test_ear_bar_graph() {
        let mut idle = IdleFallback::new(&IdleConfig::default());
        let mut sensors = SensorBank::default();
        sensors[sensor::BATTERY_CHARGE] = 0.35;

        let a = run(&mut idle, &sensors, IdleInputs::default());
        let lit: Vec<f32> = (0..10).map(|i| a[actuator::L_EAR + i]).collect();
        // 0.35 > 0.0, 0.1, 0.2, 0.3
        assert_eq!(lit, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(a[actuator::R_EAR + 3], 1.0);

        let a = run(
            &mut idle,
            &sensors,
            IdleInputs {
                shutdown_requested: true,
                ..Default::default()
            },
        );
        assert!((0..10).all(|i| a[actuator::L_EAR + i] == 0.0));
    }

    #[test]
    fn test_chest_and_eyes() {
        let mut idle = IdleFallback::new(&IdleConfig::default());
        let mut sensors = SensorBank::default();

        sensors[sensor::BATTERY_CURRENT] = 1.2;
        let a = run(&mut idle, &sensors, IdleInputs::default());
        assert_eq!(a[actuator::CHEST_GREEN], 0.25);
        assert_eq!(a[actuator::L_EYE], 1.0);
        assert_eq!(a[actuator::R_EYE + actuator::EYE_LEDS - 1], 1.0);

        sensors[sensor::BATTERY_CURRENT] = -0.8;
        let a = run(
            &mut idle,
            &sensors,
            IdleInputs {
                shutdown_requested: true,
                ..Default::default()
            },
        );
        assert_eq!(a[actuator::CHEST_GREEN], 0.0);
        assert_eq!(a[actuator::L_EYE], 0.0);
    }

    #[test]
    fn test_breathing_waits_for_calibration() {
        let mut idle = IdleFallback::new(&IdleConfig::default());
        let sensors = SensorBank::default();
        for _ in 0..50 {
            run(&mut idle, &sensors, IdleInputs::default());
        }
        assert_eq!(idle.brightness(), 0.0);

        let calibrated = IdleInputs {
            calibrated: true,
            ..Default::default()
        };
        for _ in 0..10 {
            run(&mut idle, &sensors, calibrated);
        }
        assert_eq!(idle.brightness(), GAMMA[1]);

        // 上升到顶端后折返，索引始终在表内
        let mut seen_top = false;
        for _ in 0..400 {
            let a = run(&mut idle, &sensors, calibrated);
            seen_top |= a[actuator::SKULL] == 1.0;
        }
        assert!(seen_top);
        assert!(idle.index < GAMMA.len());
    }

    #[test]
    fn test_tilted_torso_loosens_joints() {
        let mut idle = IdleFallback::new(&IdleConfig::default());
        let mut sensors = SensorBank::default();
        sensors[sensor::ANGLE_Y] = 1.4;
        sensors[sensor::position(Joint::LKneePitch)] = 0.7;

        let mut actuators = ActuatorBank::default();
        actuators.joint_stiffness_mut().fill(0.6);
        let mut sit = CountingSit {
            steps: 0,
            done_after: 1,
            resets: 0,
        };
        let mut done = true;
        idle.step(&sensors, &mut actuators, IdleInputs::default(), &mut sit, &mut done);

        assert!(!done);
        assert_eq!(sit.steps, 0);
        assert_eq!(sit.resets, 1);
        assert_eq!(actuators[actuator::stiffness(Joint::HeadYaw)], 0.0);
        assert_eq!(actuators[actuator::position(Joint::LKneePitch)], 0.7);
    }

    #[test]
    fn test_upright_torso_sits_until_done() {
        let mut idle = IdleFallback::new(&IdleConfig::default());
        let mut sensors = SensorBank::default();
        sensors[sensor::ANGLE_X] = 0.2;

        let mut actuators = ActuatorBank::default();
        let mut sit = CountingSit {
            steps: 0,
            done_after: 3,
            resets: 0,
        };
        let mut done = false;
        for _ in 0..10 {
            idle.step(&sensors, &mut actuators, IdleInputs::default(), &mut sit, &mut done);
        }
        assert!(done);
        assert_eq!(sit.steps, 3);
    }
}
