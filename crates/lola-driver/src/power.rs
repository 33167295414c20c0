//! 电源管理
//!
//! 状态机：`Normal → Warning → ShutdownPending → Shutdown`
//!
//! - 只在放电时（电流为负）评估电量阈值
//! - 电量低于 `warn_charge`：语音警告，每个 `warn_interval` 最多一次
//! - 电量低于 `critical_charge`：一次性警告，停止前端，请求关机
//! - 请求关机且坐下完成后，再发送 `shutdown_grace_cycles` 个周期，然后断电

use crate::config::PowerConfig;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const LOW_BATTERY_WARNING: &str = "Low battery, please charge me!!!";
pub const CRITICAL_BATTERY_WARNING: &str = "Low battery!";
pub const POWEROFF_ANNOUNCEMENT: &str = "Poweroff.";

/// 电源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Normal,
    Warning,
    ShutdownPending,
    Shutdown,
}

/// 电源管理器产生的动作，由调用方执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerAction {
    Say(&'static str),
    StopFrontend,
    /// 停止主循环并断电（仿真器中只停止主循环）
    PowerOff,
}

/// 电源管理器
#[derive(Debug, Clone)]
pub struct PowerManager {
    warn_charge: f32,
    critical_charge: f32,
    warn_interval: Duration,
    grace_cycles: u32,
    state: PowerState,
    shutdown_requested: bool,
    sit_completed: bool,
    grace_counter: u32,
    last_warning: Option<Instant>,
}

impl PowerManager {
    pub fn new(config: &PowerConfig) -> Self {
        Self {
            warn_charge: config.warn_charge,
            critical_charge: config.critical_charge,
            warn_interval: config.warn_interval(),
            grace_cycles: config.shutdown_grace_cycles,
            state: PowerState::Normal,
            shutdown_requested: false,
            sit_completed: false,
            grace_counter: 0,
            last_warning: None,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// 请求关机（按键长按或电量耗尽）
    pub fn request_shutdown(&mut self) {
        if !self.shutdown_requested {
            info!("Shutdown requested");
        }
        self.shutdown_requested = true;
        if self.state != PowerState::Shutdown {
            self.state = PowerState::ShutdownPending;
        }
    }

    pub fn sit_completed(&self) -> bool {
        self.sit_completed
    }

    pub fn sit_completed_mut(&mut self) -> &mut bool {
        &mut self.sit_completed
    }

    pub fn set_sit_completed(&mut self, done: bool) {
        self.sit_completed = done;
    }

    /// 链路重连后清除坐下完成标志，避免在链路中断后沿用过期姿态
    pub fn on_reconnect(&mut self) {
        self.sit_completed = false;
    }

    /// 每个周期评估一次
    ///
    /// # 参数
    /// - `charge`: 电量（0..1）
    /// - `current`: 电池电流（负值表示放电）
    /// - `now`: 当前时间（注入以便测试）
    pub fn evaluate(&mut self, charge: f32, current: f32, now: Instant) -> Vec<PowerAction> {
        let mut actions = Vec::new();

        if self.state == PowerState::Shutdown {
            return actions;
        }

        // === 关机序列：坐下完成后延迟若干周期，保证最后的 LED 帧能发出 ===
        if self.shutdown_requested && self.sit_completed {
            self.grace_counter += 1;
            if self.grace_counter > self.grace_cycles {
                self.state = PowerState::Shutdown;
                info!("Robot is sitting and frontend stopped, powering off");
                actions.push(PowerAction::Say(POWEROFF_ANNOUNCEMENT));
                actions.push(PowerAction::PowerOff);
                return actions;
            }
        } else {
            // 坐姿中断（躯干倾斜或前端重新接管）后重新计数
            self.grace_counter = 0;
        }

        // === 电量阈值（只在放电时评估） ===
        if current < 0.0 {
            if charge < self.warn_charge {
                if !self.shutdown_requested {
                    self.state = PowerState::Warning;
                }
                let due = self
                    .last_warning
                    .is_none_or(|t| now.saturating_duration_since(t) >= self.warn_interval);
                if due {
                    warn!("Battery low: {:.0}%", charge * 100.0);
                    actions.push(PowerAction::Say(LOW_BATTERY_WARNING));
                    self.last_warning = Some(now);
                }
            }

            if charge < self.critical_charge && !self.shutdown_requested {
                warn!("Battery critical: {:.0}%, initiating shutdown", charge * 100.0);
                actions.push(PowerAction::Say(CRITICAL_BATTERY_WARNING));
                actions.push(PowerAction::StopFrontend);
                self.request_shutdown();
            }
        } else if self.state == PowerState::Warning && !self.shutdown_requested {
            self.state = PowerState::Normal;
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PowerManager {
        PowerManager::new(&PowerConfig::default())
    }

    fn count_warnings(actions: &[PowerAction]) -> usize {
        actions
            .iter()
            .filter(|a| **a == PowerAction::Say(LOW_BATTERY_WARNING))
            .count()
    }

    #[test]
    fn test_warning_once_per_window() {
        let mut pm = manager();
        let start = Instant::now();
        let mut warnings = 0;
        // 每 10ms 评估一次，持续 59.99 秒
        for i in 0..5999u64 {
            let now = start + Duration::from_millis(i * 10);
            warnings += count_warnings(&pm.evaluate(0.20, -1.0, now));
        }
        assert_eq!(warnings, 1);
        assert_eq!(pm.state(), PowerState::Warning);

        let later = start + Duration::from_secs(60);
        assert_eq!(count_warnings(&pm.evaluate(0.20, -1.0, later)), 1);
    }

    #[test]
    fn test_no_warning_while_charging() {
        let mut pm = manager();
        let now = Instant::now();
        assert!(pm.evaluate(0.05, 0.5, now).is_empty());
        assert_eq!(pm.state(), PowerState::Normal);
        assert!(!pm.shutdown_requested());
    }

    #[test]
    fn test_critical_charge_requests_shutdown_once() {
        let mut pm = manager();
        let now = Instant::now();
        let actions = pm.evaluate(0.05, -1.0, now);
        assert!(actions.contains(&PowerAction::Say(CRITICAL_BATTERY_WARNING)));
        assert!(actions.contains(&PowerAction::StopFrontend));
        assert!(pm.shutdown_requested());
        assert_eq!(pm.state(), PowerState::ShutdownPending);

        let actions = pm.evaluate(0.05, -1.0, now + Duration::from_millis(10));
        assert!(!actions.contains(&PowerAction::StopFrontend));
    }

    #[test]
    fn test_power_off_after_grace_cycles() {
        let mut pm = manager();
        let now = Instant::now();
        pm.request_shutdown();

        // 还没坐下：不断电
        for _ in 0..10 {
            assert!(!pm.evaluate(0.8, 1.0, now).contains(&PowerAction::PowerOff));
        }

        pm.set_sit_completed(true);
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
        let actions = pm.evaluate(0.8, 1.0, now);
        assert_eq!(
            actions,
            vec![PowerAction::Say(POWEROFF_ANNOUNCEMENT), PowerAction::PowerOff]
        );
        assert_eq!(pm.state(), PowerState::Shutdown);
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
    }

    #[test]
    fn test_interrupted_sit_restarts_grace_cycles() {
        let mut pm = manager();
        let now = Instant::now();
        pm.request_shutdown();

        pm.set_sit_completed(true);
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());

        // 躯干倾斜，坐姿失效
        pm.set_sit_completed(false);
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());

        pm.set_sit_completed(true);
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
        assert!(pm.evaluate(0.8, 1.0, now).is_empty());
        assert!(pm.evaluate(0.8, 1.0, now).contains(&PowerAction::PowerOff));
    }

    #[test]
    fn test_reconnect_clears_sit_flag() {
        let mut pm = manager();
        pm.set_sit_completed(true);
        pm.on_reconnect();
        assert!(!pm.sit_completed());
    }
}
