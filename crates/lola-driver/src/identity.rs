//! 机器人身份识别
//!
//! 查找表在构造时注入，不使用全局状态。

use lola_protocol::RobotConfig;
use std::collections::BTreeMap;
use std::fmt;

/// Webots 仿真器使用的头部序列号
pub const SIMULATOR_HEAD_ID: &str = "P0000000000000000000";

/// 机器人名称
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RobotName {
    /// 尚未收到 `RobotConfig`，或头部序列号不在表中
    #[default]
    Unknown,
    /// 仿真器
    Simulator,
    /// 查找表中的机器人
    Named(String),
}

impl fmt::Display for RobotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotName::Unknown => write!(f, "unknown"),
            RobotName::Simulator => write!(f, "Simulator"),
            RobotName::Named(name) => write!(f, "{}", name),
        }
    }
}

/// 机器人身份
///
/// 每次（重新）连接后由第一帧的 `RobotConfig` 确定。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotIdentity {
    pub name: RobotName,
    pub body_serial: String,
    pub body_version: String,
    pub head_serial: String,
    pub head_version: String,
    pub simulator: bool,
}

/// 头部序列号 → 机器人名称
#[derive(Debug, Clone, Default)]
pub struct RobotRegistry {
    names: BTreeMap<String, String>,
}

impl RobotRegistry {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// 根据头部序列号查找名称
    ///
    /// 仿真器序列号总是识别为 [`RobotName::Simulator`]，与表内容无关。
    pub fn lookup(&self, head_id: &str) -> RobotName {
        if head_id == SIMULATOR_HEAD_ID {
            return RobotName::Simulator;
        }
        match self.names.get(head_id) {
            Some(name) if name.eq_ignore_ascii_case("simulator") => RobotName::Simulator,
            Some(name) => RobotName::Named(name.clone()),
            None => RobotName::Unknown,
        }
    }

    /// 由 `RobotConfig` 构造完整身份
    pub fn resolve(&self, config: &RobotConfig) -> RobotIdentity {
        let name = self.lookup(&config.head_id);
        RobotIdentity {
            simulator: name == RobotName::Simulator,
            name,
            body_serial: config.body_id.clone(),
            body_version: config.body_version.clone(),
            head_serial: config.head_id.clone(),
            head_version: config.head_version.clone(),
        }
    }
}

/// 身体序列号 → 陀螺仪增益
#[derive(Debug, Clone, Default)]
pub struct GyroGainTable {
    gains: BTreeMap<String, [f32; 3]>,
}

impl GyroGainTable {
    pub fn new(gains: BTreeMap<String, [f32; 3]>) -> Self {
        Self { gains }
    }

    pub fn get(&self, body_serial: &str) -> Option<[f32; 3]> {
        self.gains.get(body_serial).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(head: &str) -> RobotConfig {
        RobotConfig {
            body_id: "B1".into(),
            body_version: "1.0".into(),
            head_id: head.into(),
            head_version: "2.0".into(),
        }
    }

    #[test]
    fn test_unknown_head_resolves_to_unknown() {
        let registry = RobotRegistry::new(BTreeMap::from([("H1".into(), "Nao01".into())]));
        let identity = registry.resolve(&config("H2"));
        assert_eq!(identity.name, RobotName::Unknown);
        assert!(!identity.simulator);
        assert_eq!(identity.body_serial, "B1");
        assert_eq!(identity.head_serial, "H2");
    }

    #[test]
    fn test_known_head() {
        let registry = RobotRegistry::new(BTreeMap::from([("H1".into(), "Nao01".into())]));
        assert_eq!(registry.lookup("H1"), RobotName::Named("Nao01".into()));
        assert_eq!(registry.lookup("H1").to_string(), "Nao01");
    }

    #[test]
    fn test_simulator_is_always_known() {
        let identity = RobotRegistry::default().resolve(&config(SIMULATOR_HEAD_ID));
        assert_eq!(identity.name, RobotName::Simulator);
        assert!(identity.simulator);
    }

    #[test]
    fn test_gain_lookup() {
        let table = GyroGainTable::new(BTreeMap::from([("B1".into(), [1.0, 2.0, 3.0])]));
        assert_eq!(table.get("B1"), Some([1.0, 2.0, 3.0]));
        assert_eq!(table.get("B2"), None);
    }
}
