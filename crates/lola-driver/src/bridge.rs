//! 桥接主循环
//!
//! 单线程顺序执行，每收到一个 LoLA 帧执行一个周期：
//!
//! ```text
//! receive → decode → 身份识别 → 陀螺仪修正 → 发布传感器
//!         → 取上游执行器（有限等待） → 存活检测
//!         → 上游存活：复制上游执行器（LED 0..255 → 0..1）
//!           否则：空闲回退
//!         → 按键 → 电源管理 → encode → send → 回收子进程
//! ```
//!
//! 链路错误总是触发重连；只有致命协议错误会让 [`Bridge::run`] 返回错误。

use crate::button::{ButtonAction, ButtonDispatcher, ChestButtonClassifier, ClickClassifier};
use crate::config::BridgeConfig;
use crate::error::DriverError;
use crate::gyro::GyroCalibrator;
use crate::identity::{RobotIdentity, RobotName, RobotRegistry};
use crate::idle::{IdleFallback, IdleInputs};
use crate::ipc::{BACKEND_VERSION, InProcessTransport, IpcTransport, SensorMessage};
use crate::liveness::LivenessMonitor;
use crate::metrics::BridgeMetrics;
use crate::power::{PowerAction, PowerManager};
use crate::process::{DetachedProcesses, Frontend, ProcessControl};
use crate::sit::{LinearSitPose, SitPose};
use crate::speech::{Announcer, NullSpeech, Speech};
use crate::system::{ShellSystem, SystemControl};
use lola_link::{Connection, LolaLink, RunFlag};
use lola_protocol::{
    ActuatorBank, ChannelMap, FrameDecoder, FrameEncoder, SensorBank, stiffness_request,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, trace, warn};

/// LED 通道在上游约定中的满量程
const LED_FULL_SCALE: f32 = 255.0;

/// [`Bridge::run`] 的正常退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    /// 运行标志被清除
    Stopped,
    /// 关机序列完成（真机上已调用断电命令，仿真器中只停止主循环）
    ShutDown,
}

/// 单个周期的结果
enum CycleOutcome {
    Continue,
    ShutDown,
}

/// 桥接构造器
///
/// 除链路和配置外，所有协作者都有默认实现，测试中可以逐个替换。
///
/// # Example
///
/// ```no_run
/// use lola_driver::{BridgeBuilder, BridgeConfig};
/// use lola_link::{LolaEndpoint, SocketLink};
///
/// let config = BridgeConfig::default();
/// let link = SocketLink::new(LolaEndpoint::default())
///     .with_receive_timeout(config.link.receive_timeout());
/// let mut bridge = BridgeBuilder::new(link, config).build().unwrap();
/// let exit = bridge.run().unwrap();
/// println!("bridge exited: {:?}", exit);
/// ```
pub struct BridgeBuilder<L: LolaLink> {
    link: L,
    config: BridgeConfig,
    transport: Option<Box<dyn IpcTransport>>,
    processes: Option<Box<dyn ProcessControl>>,
    system: Option<Box<dyn SystemControl>>,
    speech: Option<Box<dyn Speech>>,
    sit_pose: Option<Box<dyn SitPose>>,
    classifier: Option<Box<dyn ClickClassifier>>,
    running: Option<RunFlag>,
    metrics: Option<Arc<BridgeMetrics>>,
}

impl<L: LolaLink> BridgeBuilder<L> {
    pub fn new(link: L, config: BridgeConfig) -> Self {
        Self {
            link,
            config,
            transport: None,
            processes: None,
            system: None,
            speech: None,
            sit_pose: None,
            classifier: None,
            running: None,
            metrics: None,
        }
    }

    /// 上游数据交换
    ///
    /// 默认的 [`InProcessTransport`] 会丢弃自己的 [`FrontendEndpoint`](crate::FrontendEndpoint)，
    /// 桥接永远看不到上游（始终处于空闲回退）。与独立的前端进程通信时，
    /// 必须在这里注入基于共享内存的 [`IpcTransport`] 实现。
    pub fn transport(mut self, transport: Box<dyn IpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn processes(mut self, processes: Box<dyn ProcessControl>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn system(mut self, system: Box<dyn SystemControl>) -> Self {
        self.system = Some(system);
        self
    }

    /// 语音输出（默认：丢弃）
    pub fn speech(mut self, speech: Box<dyn Speech>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn sit_pose(mut self, sit_pose: Box<dyn SitPose>) -> Self {
        self.sit_pose = Some(sit_pose);
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn ClickClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// 共享运行标志（信号处理器通过它停止主循环）
    pub fn run_flag(mut self, running: RunFlag) -> Self {
        self.running = Some(running);
        self
    }

    pub fn metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 校验配置并构造桥接
    pub fn build(self) -> Result<Bridge<L>, DriverError> {
        let config = self.config;
        config.validate()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(InProcessTransport::new().0));
        let processes = self
            .processes
            .unwrap_or_else(|| Box::new(DetachedProcesses::new()));
        let system = self
            .system
            .unwrap_or_else(|| Box::new(ShellSystem::new(&config.system)));
        let speech = self.speech.unwrap_or_else(|| Box::new(NullSpeech));
        let sit = self
            .sit_pose
            .unwrap_or_else(|| Box::new(LinearSitPose::new()));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(ChestButtonClassifier::new()));

        Ok(Bridge {
            connection: Connection::with_backoff(self.link, config.link.reconnect_backoff()),
            decoder: FrameDecoder::with_limits(
                ChannelMap::sensors(),
                config.link.min_packet_size,
                config.link.max_packet_size,
            ),
            encoder: FrameEncoder::new(ChannelMap::actuators()),
            recv_buf: vec![0u8; config.link.max_packet_size],
            transport,
            processes,
            system,
            announcer: Announcer::new(speech),
            sit,
            classifier,
            dispatcher: ButtonDispatcher,
            frontend: Frontend::new(&config.frontend),
            registry: config.robot_registry(),
            gyro: GyroCalibrator::new(&config.gyro, config.gyro_gain_table()),
            liveness: LivenessMonitor::new(&config.liveness),
            idle: IdleFallback::new(&config.idle),
            power: PowerManager::new(&config.power),
            actuator_timeout: config.ipc.actuator_timeout(),
            running: self.running.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            sensors: SensorBank::default(),
            actuators: ActuatorBank::default(),
            upstream: ActuatorBank::default(),
            identity: None,
            tick: 0,
        })
    }
}

/// LoLA 桥接
pub struct Bridge<L: LolaLink> {
    connection: Connection<L>,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    recv_buf: Vec<u8>,

    transport: Box<dyn IpcTransport>,
    processes: Box<dyn ProcessControl>,
    system: Box<dyn SystemControl>,
    announcer: Announcer,
    sit: Box<dyn SitPose>,
    classifier: Box<dyn ClickClassifier>,
    dispatcher: ButtonDispatcher,
    frontend: Frontend,

    registry: RobotRegistry,
    gyro: GyroCalibrator,
    liveness: LivenessMonitor,
    idle: IdleFallback,
    power: PowerManager,
    actuator_timeout: Duration,

    running: RunFlag,
    metrics: Arc<BridgeMetrics>,

    // === 周期状态 ===
    sensors: SensorBank,
    actuators: ActuatorBank,
    /// 最近一次收到的上游执行器值（取数据超时时沿用）
    upstream: ActuatorBank,
    /// 本次连接解析出的身份，重连后清空
    identity: Option<Arc<RobotIdentity>>,
    tick: u64,
}

impl<L: LolaLink> Bridge<L> {
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    pub fn connection(&self) -> &Connection<L> {
        &self.connection
    }

    /// 当前连接的机器人身份（第一帧之前为 `None`）
    pub fn identity(&self) -> Option<&RobotIdentity> {
        self.identity.as_deref()
    }

    pub fn power(&self) -> &PowerManager {
        &self.power
    }

    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    pub fn gyro(&self) -> &GyroCalibrator {
        &self.gyro
    }

    /// 下一条传感器消息的序号
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// 最近一个周期发送的执行器值
    pub fn actuators(&self) -> &ActuatorBank {
        &self.actuators
    }

    /// 运行主循环，直到运行标志被清除、关机序列完成或出现致命错误
    pub fn run(&mut self) -> Result<BridgeExit, DriverError> {
        #[cfg(feature = "realtime")]
        raise_thread_priority();

        info!("Connecting to LoLA socket");
        if !self.connect() {
            info!("Stopped while waiting for LoLA socket");
            return Ok(BridgeExit::Stopped);
        }

        let mut exit = BridgeExit::Stopped;
        while self.running.is_running() {
            match self.cycle() {
                Ok(CycleOutcome::Continue) => {},
                Ok(CycleOutcome::ShutDown) => {
                    exit = BridgeExit::ShutDown;
                    break;
                },
                Err(DriverError::Link(e)) => {
                    self.metrics.link_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("LoLA link lost ({}), reconnecting", e);
                    if !self.connect() {
                        break;
                    }
                    self.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    error!("Fatal error in LoLA bridge: {}", e);
                    self.connection.disconnect();
                    return Err(e);
                },
            }
        }

        self.release_stiffness();

        if exit == BridgeExit::ShutDown {
            self.power_off();
        }
        self.connection.disconnect();
        Ok(exit)
    }

    /// 连接（或重连）并清除与连接相关的状态
    fn connect(&mut self) -> bool {
        if !self.connection.connect(&self.running) {
            return false;
        }
        // 链路中断期间姿态未知，坐下动作从当前姿态重新开始
        self.power.on_reconnect();
        self.sit.reset();
        self.identity = None;
        true
    }

    fn cycle(&mut self) -> Result<CycleOutcome, DriverError> {
        // === 1. 接收并解码 ===
        let len = self.connection.receive(&mut self.recv_buf)?;
        let lola_timestamp_us = system_timestamp_us();
        self.metrics.frames_received.fetch_add(1, Ordering::Relaxed);

        let robot_config = match self.decoder.decode(&self.recv_buf[..len], &mut self.sensors) {
            Ok(robot_config) => robot_config,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Dropping LoLA frame: {}", e);
                self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                return Ok(CycleOutcome::Continue);
            },
        };

        if self.identity.is_none()
            && let Some(robot_config) = robot_config
        {
            self.identity = Some(Arc::new(self.resolve_identity(&robot_config)));
        }

        // === 2. 陀螺仪（身份确定之后才能查增益） ===
        if let Some(identity) = &self.identity {
            self.gyro.apply(&mut self.sensors, identity);
        }

        // === 3. 与上游交换数据 ===
        self.publish_sensors(lola_timestamp_us);
        let upstream_tick = match self.transport.fetch_actuators(self.actuator_timeout) {
            Some(msg) => {
                self.upstream = msg.actuators;
                Some(msg.tick)
            },
            None => {
                self.metrics.actuator_timeouts.fetch_add(1, Ordering::Relaxed);
                None
            },
        };
        self.liveness.update(upstream_tick);
        let connected = self.liveness.is_connected();

        // === 4. 执行器输出 ===
        if connected {
            self.actuators = self.upstream;
            for v in self.actuators.leds_mut() {
                *v /= LED_FULL_SCALE;
            }
            self.power.set_sit_completed(false);
            self.sit.reset();
        } else {
            let inputs = IdleInputs {
                calibrated: self.gyro.is_calibrated(),
                shutdown_requested: self.power.shutdown_requested(),
            };
            self.idle.step(
                &self.sensors,
                &mut self.actuators,
                inputs,
                self.sit.as_mut(),
                self.power.sit_completed_mut(),
            );
        }

        // === 5. 按键与电源 ===
        let now = Instant::now();
        let click = self.classifier.classify(self.sensors.chest_button(), now);
        if let Some(action) =
            self.dispatcher
                .dispatch(click, connected, self.power.shutdown_requested())
        {
            self.handle_button(action, connected);
        }

        let mut outcome = CycleOutcome::Continue;
        let power_actions = self.power.evaluate(
            self.sensors.battery_charge(),
            self.sensors.battery_current(),
            now,
        );
        for action in power_actions {
            match action {
                PowerAction::Say(text) => self.announcer.say(text),
                PowerAction::StopFrontend => {
                    self.frontend
                        .stop(self.processes.as_mut(), &mut self.announcer, connected)
                },
                PowerAction::PowerOff => outcome = CycleOutcome::ShutDown,
            }
        }

        // === 6. 编码并发送 ===
        let pkt = self.encoder.encode(&self.actuators)?;
        self.connection.send(pkt)?;
        self.metrics.frames_sent.fetch_add(1, Ordering::Relaxed);

        let reaped = self.processes.reap() + self.system.reap();
        if reaped > 0 {
            debug!("Reaped {} child process(es)", reaped);
        }

        trace!("Cycle {} done (connected: {})", self.tick, connected);
        Ok(outcome)
    }

    fn resolve_identity(&self, robot_config: &lola_protocol::RobotConfig) -> RobotIdentity {
        let identity = self.registry.resolve(robot_config);
        info!(
            "LoLA connection established on robot \"{}\" (head {}, body {})",
            identity.name, identity.head_serial, identity.body_serial
        );
        if identity.name == RobotName::Unknown {
            warn!("Unknown robot head serial: {}", identity.head_serial);
        }
        identity
    }

    fn publish_sensors(&mut self, lola_timestamp_us: u64) {
        let robot = self.identity.clone().unwrap_or_default();
        let msg = SensorMessage {
            tick: self.tick,
            timestamp_us: system_timestamp_us(),
            lola_timestamp_us,
            simulator: robot.simulator,
            robot,
            backend_version: BACKEND_VERSION,
            connected: self.liveness.is_connected(),
            sensors: self.sensors,
        };
        self.transport.publish_sensors(msg);
        self.tick += 1;
    }

    fn handle_button(&mut self, action: ButtonAction, connected: bool) {
        debug!("Chest button action: {:?}", action);
        match action {
            ButtonAction::StartFrontend => {
                self.frontend
                    .start(self.processes.as_mut(), &mut self.announcer)
            },
            ButtonAction::StopFrontend => {
                self.frontend
                    .stop(self.processes.as_mut(), &mut self.announcer, connected)
            },
            ButtonAction::Shutdown => {
                self.announcer.say("System shutdown.");
                self.frontend
                    .stop(self.processes.as_mut(), &mut self.announcer, connected);
                self.power.request_shutdown();
            },
            ButtonAction::CameraReset => {
                self.announcer.say("Camera reset.");
                if let Err(e) = self.system.reset_cameras() {
                    error!("Camera reset failed: {}", e);
                }
                self.frontend.kill(self.processes.as_mut());
            },
        }
    }

    /// 退出前等待下一个 LoLA 周期开始，然后放松所有关节
    fn release_stiffness(&mut self) {
        if !self.connection.is_connected() {
            return;
        }
        if let Err(e) = self.connection.receive(&mut self.recv_buf) {
            warn!("Cannot release stiffness: {}", e);
            return;
        }
        let result = stiffness_request(-1.0)
            .map_err(DriverError::from)
            .and_then(|pkt| self.connection.send(&pkt).map_err(DriverError::from));
        match result {
            Ok(()) => info!("Stiffness released"),
            Err(e) => warn!("Cannot release stiffness: {}", e),
        }
    }

    fn power_off(&mut self) {
        let simulator = self.identity.as_ref().is_some_and(|id| id.simulator);
        if simulator {
            info!("Shutdown in simulator, not powering off");
            return;
        }
        info!("Powering off");
        if let Err(e) = self.system.power_off() {
            error!("Power off failed: {}", e);
        }
    }
}

fn system_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(feature = "realtime")]
fn raise_thread_priority() {
    use thread_priority::*;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("Bridge thread priority set to MAX (realtime)"),
        Err(e) => warn!(
            "Failed to set bridge thread priority: {:?}. \
            On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            e
        ),
    }
}
