//! 胸口按键
//!
//! [`ChestButtonClassifier`] 把按键传感器的原始值分类为点击事件，
//! [`ButtonDispatcher`] 把点击事件映射为进程/关机动作。

use std::time::{Duration, Instant};

/// 多击判定超时：最后一次按下后松开超过此时间即结束计数
pub const MULTI_CLICK_TIMEOUT: Duration = Duration::from_millis(500);

/// 长按判定时间
pub const HOLD_TIMEOUT: Duration = Duration::from_secs(3);

/// 相机复位所需的点击次数
pub const CAMERA_RESET_CLICKS: u32 = 6;

/// 点击类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    None,
    Single,
    Double,
    Triple,
    Long,
    CameraReset,
}

/// 点击分类器接口
pub trait ClickClassifier: Send {
    /// 输入按键原始值（> 0 为按下），返回本周期的点击事件
    fn classify(&mut self, value: f32, now: Instant) -> ClickKind;
}

/// 默认胸口按键分类器
#[derive(Debug, Clone, Default)]
pub struct ChestButtonClassifier {
    pressed: bool,
    count: u32,
    press_start: Option<Instant>,
}

impl ChestButtonClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClickClassifier for ChestButtonClassifier {
    fn classify(&mut self, value: f32, now: Instant) -> ClickKind {
        let pressed = value > 0.0;
        let since_press = self
            .press_start
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::MAX);
        let mut kind = ClickKind::None;

        if pressed {
            if !self.pressed {
                self.count += 1;
                self.press_start = Some(now);
            } else if since_press > HOLD_TIMEOUT {
                self.count = 0;
                self.press_start = Some(now);
                kind = ClickKind::Long;
            }
        } else if since_press > MULTI_CLICK_TIMEOUT {
            kind = match self.count.min(CAMERA_RESET_CLICKS) {
                1 => ClickKind::Single,
                2 => ClickKind::Double,
                3 => ClickKind::Triple,
                CAMERA_RESET_CLICKS => ClickKind::CameraReset,
                _ => ClickKind::None,
            };
            self.count = 0;
        }

        self.pressed = pressed;
        kind
    }
}

/// 按键动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    StartFrontend,
    StopFrontend,
    /// 播报、停止前端并请求关机
    Shutdown,
    CameraReset,
}

/// 点击事件 → 动作
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonDispatcher;

impl ButtonDispatcher {
    /// # 参数
    /// - `connected`: 上游当前是否存活
    /// - `shutdown_requested`: 是否已在关机过程中
    pub fn dispatch(
        &self,
        click: ClickKind,
        connected: bool,
        shutdown_requested: bool,
    ) -> Option<ButtonAction> {
        match click {
            ClickKind::Single if !connected => Some(ButtonAction::StartFrontend),
            ClickKind::Triple if connected => Some(ButtonAction::StopFrontend),
            ClickKind::Triple => Some(ButtonAction::StartFrontend),
            ClickKind::Long if !shutdown_requested => Some(ButtonAction::Shutdown),
            ClickKind::CameraReset => Some(ButtonAction::CameraReset),
            _ => None,
        }
    }
}
