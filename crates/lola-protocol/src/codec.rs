//! msgpack 帧编解码
//!
//! 传感器帧：`{ chain 名称: [数值, ...], ..., "RobotConfig": [bodyId, bodyVersion, headId, headVersion] }`
//!
//! 执行器帧：按执行器映射顺序写出每个 chain，`Sonar` chain 为布尔值（`value > 0`），其余为 `f32`。

use crate::bank::{ActuatorBank, Bank, SensorBank};
use crate::error::ProtocolError;
use crate::ids::NUM_JOINTS;
use crate::mapping::{ChannelMap, chain};
use rmpv::Value;
use std::fmt::Display;

/// LoLA 单帧最小长度（字节），更短的帧是不完整的 msgpack 对象
pub const LOLA_PKT_SIZE: usize = 896;

/// 接收缓冲区大小
pub const MAX_PACKET_SIZE: usize = LOLA_PKT_SIZE * 5;

/// 机器人硬件标识（来自 `RobotConfig` chain）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotConfig {
    pub body_id: String,
    pub body_version: String,
    pub head_id: String,
    pub head_version: String,
}

fn encode_err<E: Display>(e: E) -> ProtocolError {
    ProtocolError::Encode(e.to_string())
}

/// 将线格式中的单个元素转换为 `f32`
///
/// LoLA 会混用 float32/float64/整数/布尔值（例如关节状态是整数）。
fn coerce(chain: &str, value: &Value) -> Result<f32, ProtocolError> {
    match value {
        Value::F32(v) => Ok(*v),
        Value::F64(v) => Ok(*v as f32),
        Value::Integer(i) => i.as_f64().map(|v| v as f32).ok_or_else(|| {
            ProtocolError::Malformed(format!("integer out of range in chain '{}'", chain))
        }),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ProtocolError::Malformed(format!(
            "non-numeric element {} in chain '{}'",
            other, chain
        ))),
    }
}

fn parse_robot_config(values: &[Value]) -> Result<RobotConfig, ProtocolError> {
    let field = |i: usize| -> Result<String, ProtocolError> {
        values
            .get(i)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ProtocolError::Malformed(format!("RobotConfig field {} is not a string", i)))
    };
    Ok(RobotConfig {
        body_id: field(0)?,
        body_version: field(1)?,
        head_id: field(2)?,
        head_version: field(3)?,
    })
}

/// 帧解码器
///
/// 解码先写入临时副本，整帧成功后才提交，被丢弃的帧不会留下部分更新。
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    map: ChannelMap,
    min_len: usize,
    max_len: usize,
}

impl FrameDecoder {
    /// 使用默认长度限制（`LOLA_PKT_SIZE` / `MAX_PACKET_SIZE`）
    pub fn new(map: ChannelMap) -> Self {
        Self::with_limits(map, LOLA_PKT_SIZE, MAX_PACKET_SIZE)
    }

    pub fn with_limits(map: ChannelMap, min_len: usize, max_len: usize) -> Self {
        Self {
            map,
            min_len,
            max_len,
        }
    }

    pub fn map(&self) -> &ChannelMap {
        &self.map
    }

    /// 解码一个传感器帧
    ///
    /// 成功时更新 `bank`（包括重新计算的脚底压力总和），并返回帧中的 `RobotConfig`（如果有）。
    ///
    /// # 错误
    ///
    /// - `Truncated` / `Oversized` / `Malformed`: 丢弃本帧，`bank` 不变
    /// - `UnknownChain` / `ChainSizeMismatch`: 致命（见 [`ProtocolError::is_fatal`]）
    pub fn decode(
        &self,
        pkt: &[u8],
        bank: &mut SensorBank,
    ) -> Result<Option<RobotConfig>, ProtocolError> {
        let mut staged = *bank;
        let robot = self.decode_into(pkt, &mut staged)?;
        staged.update_fsr_totals();
        *bank = staged;
        Ok(robot)
    }

    /// 解码任意映射到任意存储（执行器帧回读也使用此方法）
    pub fn decode_into<const N: usize>(
        &self,
        pkt: &[u8],
        bank: &mut Bank<N>,
    ) -> Result<Option<RobotConfig>, ProtocolError> {
        if pkt.len() < self.min_len {
            return Err(ProtocolError::Truncated {
                len: pkt.len(),
                min: self.min_len,
            });
        }
        if pkt.len() >= self.max_len {
            return Err(ProtocolError::Oversized {
                len: pkt.len(),
                max: self.max_len,
            });
        }

        let mut rd = pkt;
        let root =
            rmpv::decode::read_value(&mut rd).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let entries = match root {
            Value::Map(entries) => entries,
            other => {
                return Err(ProtocolError::Malformed(format!(
                    "expected map at top level, got {}",
                    other
                )));
            },
        };

        let mut staged = *bank;
        let mut robot = None;

        for (key, value) in &entries {
            let name = key
                .as_str()
                .ok_or_else(|| ProtocolError::Malformed(format!("non-string chain key {}", key)))?;
            let chain = self
                .map
                .get(name)
                .ok_or_else(|| ProtocolError::UnknownChain(name.to_owned()))?;
            let values = value.as_array().ok_or_else(|| {
                ProtocolError::Malformed(format!("chain '{}' is not an array", name))
            })?;
            if values.len() != chain.size() {
                return Err(ProtocolError::ChainSizeMismatch {
                    chain: name.to_owned(),
                    expected: chain.size(),
                    actual: values.len(),
                });
            }

            if name == chain::ROBOT_CONFIG {
                robot = Some(parse_robot_config(values)?);
                continue;
            }

            for (slot, v) in chain.slots.iter().zip(values) {
                let Some(slot) = *slot else {
                    continue;
                };
                let x = coerce(name, v)?;
                let target = staged.as_mut_slice().get_mut(slot).ok_or_else(|| {
                    ProtocolError::Malformed(format!("slot {} out of range for chain '{}'", slot, name))
                })?;
                *target = x;
            }
        }

        *bank = staged;
        Ok(robot)
    }
}

/// 执行器帧编码器
///
/// 输出缓冲区跨周期复用，每次编码前清空。
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    map: ChannelMap,
    buf: Vec<u8>,
}

impl FrameEncoder {
    pub fn new(map: ChannelMap) -> Self {
        Self {
            map,
            buf: Vec::with_capacity(LOLA_PKT_SIZE),
        }
    }

    /// 编码执行器存储，返回的切片在下一次 `encode` 前有效
    pub fn encode(&mut self, bank: &ActuatorBank) -> Result<&[u8], ProtocolError> {
        self.buf.clear();
        let buf = &mut self.buf;

        rmp::encode::write_map_len(buf, self.map.len() as u32).map_err(encode_err)?;
        for c in self.map.iter() {
            rmp::encode::write_str(buf, c.name).map_err(encode_err)?;
            rmp::encode::write_array_len(buf, c.size() as u32).map_err(encode_err)?;
            for slot in &c.slots {
                let value = slot.map(|s| bank[s]).unwrap_or(0.0);
                if c.name == chain::SONAR {
                    rmp::encode::write_bool(buf, value > 0.0).map_err(encode_err)?;
                } else {
                    rmp::encode::write_f32(buf, value).map_err(encode_err)?;
                }
            }
        }

        Ok(&self.buf)
    }
}

/// 构造独立的刚度请求帧
///
/// 胸口 LED 设为黄色，所有关节刚度设为 `stiffness`（`-1` 表示松开）。
pub fn stiffness_request(stiffness: f32) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(256);

    rmp::encode::write_map_len(&mut buf, 2).map_err(encode_err)?;

    rmp::encode::write_str(&mut buf, chain::CHEST).map_err(encode_err)?;
    rmp::encode::write_array_len(&mut buf, 3).map_err(encode_err)?;
    for v in [1.0, 1.0, 0.0] {
        rmp::encode::write_f32(&mut buf, v).map_err(encode_err)?;
    }

    rmp::encode::write_str(&mut buf, chain::STIFFNESS).map_err(encode_err)?;
    rmp::encode::write_array_len(&mut buf, NUM_JOINTS as u32).map_err(encode_err)?;
    for _ in 0..NUM_JOINTS {
        rmp::encode::write_f32(&mut buf, stiffness).map_err(encode_err)?;
    }

    Ok(buf)
}

/// 按传感器映射编码一个 LoLA 风格的传感器帧
///
/// 用于仿真和测试；未映射的槽位写 0，`RobotConfig` 写入 `robot` 的四个字段。
pub fn encode_sensor_frame(
    map: &ChannelMap,
    bank: &SensorBank,
    robot: &RobotConfig,
) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(LOLA_PKT_SIZE + 128);

    rmp::encode::write_map_len(&mut buf, map.len() as u32).map_err(encode_err)?;
    for c in map.iter() {
        rmp::encode::write_str(&mut buf, c.name).map_err(encode_err)?;
        rmp::encode::write_array_len(&mut buf, c.size() as u32).map_err(encode_err)?;
        if c.name == chain::ROBOT_CONFIG {
            for s in [
                &robot.body_id,
                &robot.body_version,
                &robot.head_id,
                &robot.head_version,
            ] {
                rmp::encode::write_str(&mut buf, s).map_err(encode_err)?;
            }
            continue;
        }
        for slot in &c.slots {
            let value = slot.map(|s| bank[s]).unwrap_or(0.0);
            rmp::encode::write_f32(&mut buf, value).map_err(encode_err)?;
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{actuator, sensor};
    use proptest::prelude::*;

    fn robot() -> RobotConfig {
        RobotConfig {
            body_id: "B1".into(),
            body_version: "1.0".into(),
            head_id: "H2".into(),
            head_version: "2.0".into(),
        }
    }

    /// 手工构造一个只含指定 chain 的帧，并填充到最小长度以上
    fn frame_with(entries: Vec<(&str, Value)>) -> Vec<u8> {
        let mut entries: Vec<(Value, Value)> =
            entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect();
        // 用 Stiffness（全部未映射）把帧撑到最小长度
        entries.push((
            Value::from(chain::STIFFNESS),
            Value::Array(vec![Value::F64(0.0); NUM_JOINTS]),
        ));
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::Map(entries)).unwrap();
        buf
    }

    fn lenient_decoder() -> FrameDecoder {
        FrameDecoder::with_limits(ChannelMap::sensors(), 0, MAX_PACKET_SIZE)
    }

    #[test]
    fn test_sensor_frame_decode() {
        let map = ChannelMap::sensors();
        let mut src = SensorBank::default();
        src[sensor::GYRO_X] = 0.5;
        src[sensor::BATTERY_CHARGE] = 0.8;
        src[sensor::L_FSR_FRONT_LEFT] = 1.0;
        src[sensor::L_FSR_REAR_RIGHT] = 2.0;
        src[sensor::CHEST_BUTTON] = 1.0;

        let pkt = encode_sensor_frame(&map, &src, &robot()).unwrap();
        assert!(pkt.len() >= LOLA_PKT_SIZE);

        let mut bank = SensorBank::default();
        let decoded = FrameDecoder::new(map).decode(&pkt, &mut bank).unwrap();
        assert_eq!(decoded, Some(robot()));
        assert_eq!(bank[sensor::GYRO_X], 0.5);
        assert_eq!(bank[sensor::BATTERY_CHARGE], 0.8);
        assert_eq!(bank[sensor::CHEST_BUTTON], 1.0);
        assert_eq!(bank[sensor::L_FSR_TOTAL], 3.0);
        assert_eq!(bank[sensor::R_FSR_TOTAL], 0.0);
    }

    #[test]
    fn test_truncated_frame_is_dropped() {
        let mut bank = SensorBank::default();
        bank[sensor::GYRO_X] = 7.0;
        let err = FrameDecoder::new(ChannelMap::sensors())
            .decode(&[0x80; 12], &mut bank)
            .unwrap_err();
        assert_eq!(err, ProtocolError::Truncated { len: 12, min: 896 });
        assert!(!err.is_fatal());
        assert_eq!(bank[sensor::GYRO_X], 7.0);
    }

    #[test]
    fn test_oversized_frame_is_dropped() {
        let pkt = vec![0u8; MAX_PACKET_SIZE];
        let err = FrameDecoder::new(ChannelMap::sensors())
            .decode(&pkt, &mut SensorBank::default())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Oversized { .. }));
    }

    #[test]
    fn test_numeric_coercion() {
        let pkt = frame_with(vec![
            (
                chain::GYROSCOPE,
                Value::Array(vec![Value::F32(0.25), Value::F64(-0.5), Value::from(2)]),
            ),
            (
                chain::SONAR,
                Value::Array(vec![Value::Boolean(true), Value::Boolean(false)]),
            ),
        ]);
        let mut bank = SensorBank::default();
        lenient_decoder().decode(&pkt, &mut bank).unwrap();
        assert_eq!(bank.gyro(), [0.25, -0.5, 2.0]);
        assert_eq!(bank[sensor::L_SONAR], 1.0);
        assert_eq!(bank[sensor::R_SONAR], 0.0);
    }

    #[test]
    fn test_non_numeric_element_is_malformed_and_atomic() {
        let pkt = frame_with(vec![
            (
                chain::ACCELEROMETER,
                Value::Array(vec![Value::F32(9.0), Value::F32(9.0), Value::F32(9.0)]),
            ),
            (
                chain::GYROSCOPE,
                Value::Array(vec![Value::F32(1.0), Value::from("x"), Value::F32(1.0)]),
            ),
        ]);
        let mut bank = SensorBank::default();
        let err = lenient_decoder().decode(&pkt, &mut bank).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
        // 同一帧中已解析的 chain 不应被提交
        assert_eq!(bank.accel(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let pkt = frame_with(vec![(
            chain::GYROSCOPE,
            Value::Array(vec![Value::F32(1.0), Value::F32(1.0)]),
        )]);
        let err = lenient_decoder()
            .decode(&pkt, &mut SensorBank::default())
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ChainSizeMismatch {
                chain: "Gyroscope".into(),
                expected: 3,
                actual: 2
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_chain_is_fatal() {
        let pkt = frame_with(vec![("Lidar", Value::Array(vec![Value::F32(1.0)]))]);
        let err = lenient_decoder()
            .decode(&pkt, &mut SensorBank::default())
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownChain("Lidar".into()));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_robot_config_must_be_strings() {
        let pkt = frame_with(vec![(
            chain::ROBOT_CONFIG,
            Value::Array(vec![
                Value::from("B1"),
                Value::from(1),
                Value::from("H2"),
                Value::from("2.0"),
            ]),
        )]);
        let err = lenient_decoder()
            .decode(&pkt, &mut SensorBank::default())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_encoder_reuses_buffer() {
        let mut encoder = FrameEncoder::new(ChannelMap::actuators());
        let bank = ActuatorBank::default();
        let first = encoder.encode(&bank).unwrap().to_vec();
        let second = encoder.encode(&bank).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stiffness_request_layout() {
        let pkt = stiffness_request(-1.0).unwrap();
        let value = rmpv::decode::read_value(&mut pkt.as_slice()).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].0.as_str(), Some("Chest"));
        assert_eq!(map[0].1.as_array().unwrap().len(), 3);
        assert_eq!(map[1].0.as_str(), Some("Stiffness"));
        let stiffness = map[1].1.as_array().unwrap();
        assert_eq!(stiffness.len(), NUM_JOINTS);
        assert!(stiffness.iter().all(|v| *v == Value::F32(-1.0)));
    }

    proptest! {
        #[test]
        fn prop_actuator_round_trip(values in proptest::collection::vec(proptest::num::f32::ANY, actuator::COUNT)) {
            let mut bank = ActuatorBank::default();
            bank.as_mut_slice().copy_from_slice(&values);

            let mut encoder = FrameEncoder::new(ChannelMap::actuators());
            let pkt = encoder.encode(&bank).unwrap().to_vec();

            let decoder = FrameDecoder::with_limits(ChannelMap::actuators(), 0, usize::MAX);
            let mut decoded = ActuatorBank::default();
            decoder.decode_into(&pkt, &mut decoded).unwrap();

            for slot in 0..actuator::L_SONAR {
                prop_assert_eq!(decoded[slot].to_bits(), bank[slot].to_bits());
            }
        }

        #[test]
        fn prop_sonar_is_boolean(left in proptest::num::f32::ANY, right in prop_oneof![Just(0.0f32), Just(-0.0f32), -10.0f32..10.0]) {
            let mut bank = ActuatorBank::default();
            bank[actuator::L_SONAR] = left;
            bank[actuator::R_SONAR] = right;

            let mut encoder = FrameEncoder::new(ChannelMap::actuators());
            let pkt = encoder.encode(&bank).unwrap();
            let value = rmpv::decode::read_value(&mut &pkt[..]).unwrap();
            let map = value.as_map().unwrap();
            let (_, sonar) = map.iter().find(|(k, _)| k.as_str() == Some("Sonar")).unwrap();
            let sonar = sonar.as_array().unwrap();

            prop_assert_eq!(sonar[0].clone(), Value::Boolean(left > 0.0));
            prop_assert_eq!(sonar[1].clone(), Value::Boolean(right > 0.0));
        }
    }
}
