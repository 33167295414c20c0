//! 子进程控制
//!
//! 前端进程以分离方式启动（标准输入输出重定向到空设备），
//! 每个周期用非阻塞等待回收已退出的子进程。

use crate::config::FrontendConfig;
use crate::speech::Announcer;
use std::process::{Child, Command, Stdio};
use tracing::{debug, error, info};

/// 进程控制接口
pub trait ProcessControl: Send {
    /// 启动分离的子进程
    fn spawn_detached(&mut self, program: &str, arg: Option<&str>) -> std::io::Result<()>;

    /// 回收已退出的子进程（非阻塞），返回回收数量
    fn reap(&mut self) -> usize;
}

/// 基于 `std::process` 的实现
#[derive(Debug, Default)]
pub struct DetachedProcesses {
    children: Vec<Child>,
}

impl DetachedProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尚未回收的子进程数
    pub fn pending(&self) -> usize {
        self.children.len()
    }
}

impl ProcessControl for DetachedProcesses {
    fn spawn_detached(&mut self, program: &str, arg: Option<&str>) -> std::io::Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = cmd.spawn()?;
        debug!("Spawned {} (pid {})", program, child.id());
        self.children.push(child);
        Ok(())
    }

    fn reap(&mut self) -> usize {
        let before = self.children.len();
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Child {} exited: {}", child.id(), status);
                false
            },
            Ok(None) => true,
            Err(e) => {
                error!("Failed to poll child {}: {}", child.id(), e);
                false
            },
        });
        before - self.children.len()
    }
}

/// 前端进程的启动/停止
#[derive(Debug, Clone)]
pub struct Frontend {
    path: String,
    process_name: String,
    kill_command: String,
}

impl Frontend {
    pub fn new(config: &FrontendConfig) -> Self {
        Self {
            path: config.path.clone(),
            process_name: config.process_name.clone(),
            kill_command: config.kill_command.clone(),
        }
    }

    pub fn start(&self, processes: &mut dyn ProcessControl, announcer: &mut Announcer) {
        match processes.spawn_detached(&self.path, None) {
            Ok(()) => {
                info!("Frontend started: {}", self.path);
                announcer.say("Starting frontend.");
            },
            Err(e) => {
                error!("Cannot start frontend {}: {}", self.path, e);
                announcer.say("Failed to start frontend.");
            },
        }
    }

    /// 按名称结束前端；只有上游当前存活时才播报
    pub fn stop(
        &self,
        processes: &mut dyn ProcessControl,
        announcer: &mut Announcer,
        connected: bool,
    ) {
        if connected {
            announcer.say("Stopping frontend.");
        }
        self.kill(processes);
    }

    /// 不播报，直接结束前端
    pub fn kill(&self, processes: &mut dyn ProcessControl) {
        if let Err(e) = processes.spawn_detached(&self.kill_command, Some(&self.process_name)) {
            error!("Cannot stop frontend via {}: {}", self.kill_command, e);
        }
    }
}
