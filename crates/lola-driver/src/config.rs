//! 桥接配置
//!
//! 所有字段都有默认值，配置文件只需要写出需要覆盖的部分：
//!
//! ```toml
//! [power]
//! warn_charge = 0.3
//!
//! [robots]
//! "P0000000000000000000" = "Simulator"
//! "ALDEBARAN-HEAD-0001" = "Nao01"
//!
//! [gyro_gains]
//! "ALDEBARAN-BODY-0001" = [1.02, 0.98, 1.0]
//! ```

use crate::identity::{GyroGainTable, RobotRegistry, SIMULATOR_HEAD_ID};
use lola_protocol::{LOLA_PKT_SIZE, MAX_PACKET_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 链路配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 重连退避时间（毫秒）
    pub reconnect_backoff_ms: u64,
    /// 接收超时（毫秒），超时视为链路错误
    pub receive_timeout_ms: u64,
    /// 最小帧长度（字节）
    pub min_packet_size: usize,
    /// 接收缓冲区大小（字节）
    pub max_packet_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: 500,
            receive_timeout_ms: 1000,
            min_packet_size: LOLA_PKT_SIZE,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

/// 进程间通信配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// 等待上游执行器数据的最长时间（毫秒）
    pub actuator_timeout_ms: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            actuator_timeout_ms: 10,
        }
    }
}

impl IpcConfig {
    pub fn actuator_timeout(&self) -> Duration {
        Duration::from_millis(self.actuator_timeout_ms)
    }
}

/// 陀螺仪零偏标定参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GyroConfig {
    /// 相邻两个新样本之差的平方范数上限
    pub stable_threshold: f32,
    /// 连续稳定样本数
    pub calibration_samples: u32,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            stable_threshold: 0.0002,
            calibration_samples: 200,
        }
    }
}

/// 上游存活检测参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// 滞回计数器上限
    pub max_count: u32,
    /// 计数器超过此值时判定为已连接
    pub connect_threshold: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            max_count: 15,
            connect_threshold: 10,
        }
    }
}

/// 电源管理参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// 低电量警告阈值（0..1）
    pub warn_charge: f32,
    /// 关机阈值（0..1）
    pub critical_charge: f32,
    /// 低电量警告最小间隔（秒）
    pub warn_interval_secs: u64,
    /// 坐下完成后再发送的周期数
    pub shutdown_grace_cycles: u32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            warn_charge: 0.25,
            critical_charge: 0.10,
            warn_interval_secs: 60,
            shutdown_grace_cycles: 2,
        }
    }
}

impl PowerConfig {
    pub fn warn_interval(&self) -> Duration {
        Duration::from_secs(self.warn_interval_secs)
    }
}

/// 空闲回退参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// 躯干倾角上限（rad），两轴均小于此值才执行坐下动作
    pub upright_limit: f32,
    /// 呼吸灯每隔多少个周期前进一格
    pub blink_period_cycles: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            upright_limit: 1.0,
            blink_period_cycles: 10,
        }
    }
}

/// 前端进程配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// 可执行文件路径
    pub path: String,
    /// 进程名（用于按名称结束进程）
    pub process_name: String,
    /// 按名称结束进程的命令
    pub kill_command: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            path: "/home/nao/bin/jsfrontend".to_string(),
            process_name: "jsfrontend".to_string(),
            kill_command: "/usr/bin/killall".to_string(),
        }
    }
}

/// 系统命令配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// 语音合成 FIFO
    pub tts_fifo: PathBuf,
    /// 关机命令（空格分隔）
    pub poweroff_command: String,
    /// 相机复位命令（空格分隔）
    pub camera_reset_command: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tts_fifo: PathBuf::from("/tmp/tts"),
            poweroff_command: "/usr/bin/sudo /usr/sbin/poweroff".to_string(),
            camera_reset_command: "/opt/aldebaran/libexec/reset-cameras.sh toggle".to_string(),
        }
    }
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub link: LinkConfig,
    pub ipc: IpcConfig,
    pub gyro: GyroConfig,
    pub liveness: LivenessConfig,
    pub power: PowerConfig,
    pub idle: IdleConfig,
    pub frontend: FrontendConfig,
    pub system: SystemConfig,
    /// 头部序列号 → 机器人名称
    pub robots: BTreeMap<String, String>,
    /// 身体序列号 → 陀螺仪增益 (X, Y, Z)
    pub gyro_gains: BTreeMap<String, [f32; 3]>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            ipc: IpcConfig::default(),
            gyro: GyroConfig::default(),
            liveness: LivenessConfig::default(),
            power: PowerConfig::default(),
            idle: IdleConfig::default(),
            frontend: FrontendConfig::default(),
            system: SystemConfig::default(),
            robots: BTreeMap::from([(SIMULATOR_HEAD_ID.to_string(), "Simulator".to_string())]),
            gyro_gains: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 检查参数之间的约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.min_packet_size >= self.link.max_packet_size {
            return Err(ConfigError::Invalid(format!(
                "link.min_packet_size ({}) must be smaller than link.max_packet_size ({})",
                self.link.min_packet_size, self.link.max_packet_size
            )));
        }
        if self.liveness.connect_threshold >= self.liveness.max_count {
            return Err(ConfigError::Invalid(format!(
                "liveness.connect_threshold ({}) must be smaller than liveness.max_count ({})",
                self.liveness.connect_threshold, self.liveness.max_count
            )));
        }
        if self.power.critical_charge > self.power.warn_charge {
            return Err(ConfigError::Invalid(format!(
                "power.critical_charge ({}) exceeds power.warn_charge ({})",
                self.power.critical_charge, self.power.warn_charge
            )));
        }
        if self.gyro.calibration_samples == 0 {
            return Err(ConfigError::Invalid(
                "gyro.calibration_samples must be positive".to_string(),
            ));
        }
        if self.idle.blink_period_cycles == 0 {
            return Err(ConfigError::Invalid(
                "idle.blink_period_cycles must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// 头部序列号表
    pub fn robot_registry(&self) -> RobotRegistry {
        RobotRegistry::new(self.robots.clone())
    }

    /// 陀螺仪增益表
    pub fn gyro_gain_table(&self) -> GyroGainTable {
        GyroGainTable::new(self.gyro_gains.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.link.reconnect_backoff(), Duration::from_millis(500));
        assert_eq!(config.link.min_packet_size, 896);
        assert_eq!(config.link.max_packet_size, 896 * 5);
        assert_eq!(config.ipc.actuator_timeout(), Duration::from_millis(10));
        assert_eq!(config.gyro.calibration_samples, 200);
        assert_eq!(config.liveness.max_count, 15);
        assert_eq!(config.power.warn_interval(), Duration::from_secs(60));
        assert_eq!(
            config.robots.get(SIMULATOR_HEAD_ID).map(String::as_str),
            Some("Simulator")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [power]
            warn_charge = 0.3

            [gyro_gains]
            "BODY-1" = [1.1, 0.9, 1.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.power.warn_charge, 0.3);
        assert_eq!(config.power.critical_charge, 0.10);
        assert_eq!(config.gyro_gains.get("BODY-1"), Some(&[1.1, 0.9, 1.0]));
        assert_eq!(config.frontend.process_name, "jsfrontend");
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let err = BridgeConfig::from_toml_str(
            r#"
            [liveness]
            max_count = 5
            connect_threshold = 10
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = BridgeConfig::from_toml_str("[power]\nwarn_charge = \"low\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[robots]\n\"HEAD-7\" = \"Nao07\"").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.robots.get("HEAD-7").map(String::as_str), Some("Nao07"));
        // 用户提供的 robots 表整体替换默认表
        assert!(!config.robots.contains_key(SIMULATOR_HEAD_ID));

        let err = BridgeConfig::load("/nonexistent/lola.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
