//! 系统级动作：断电、相机复位
//!
//! 断电只在主循环退出后执行，同步等待命令结束；
//! 相机复位在周期内触发，只启动命令，由每个周期的 `reap` 回收。

use crate::config::SystemConfig;
use std::process::{Child, Command, Stdio};
use tracing::{debug, error, info};

/// 系统控制接口
pub trait SystemControl: Send {
    /// 断电（阻塞直到命令结束）
    fn power_off(&mut self) -> std::io::Result<()>;

    /// 启动相机复位（不等待命令结束）
    fn reset_cameras(&mut self) -> std::io::Result<()>;

    /// 回收已结束的后台命令（非阻塞），返回回收数量
    fn reap(&mut self) -> usize;
}

/// 通过外部命令执行系统动作
#[derive(Debug)]
pub struct ShellSystem {
    poweroff: Vec<String>,
    camera_reset: Vec<String>,
    running: Vec<Child>,
}

impl ShellSystem {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            poweroff: split_command(&config.poweroff_command),
            camera_reset: split_command(&config.camera_reset_command),
            running: Vec::new(),
        }
    }

    /// 尚未结束的后台命令数
    pub fn pending(&self) -> usize {
        self.running.len()
    }
}

fn split_command(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn command(argv: &[String]) -> std::io::Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| std::io::Error::other("empty command"))?;
    info!("Running {}", argv.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// 同步执行命令，非零退出码视为错误
fn run(argv: &[String]) -> std::io::Result<()> {
    let status = command(argv)?.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("{} exited with {}", argv[0], status)))
    }
}

impl SystemControl for ShellSystem {
    fn power_off(&mut self) -> std::io::Result<()> {
        run(&self.poweroff)
    }

    fn reset_cameras(&mut self) -> std::io::Result<()> {
        let child = command(&self.camera_reset)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("Camera reset started (pid {})", child.id());
        self.running.push(child);
        Ok(())
    }

    fn reap(&mut self) -> usize {
        let before = self.running.len();
        self.running.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) if status.success() => {
                debug!("System command {} finished", child.id());
                false
            },
            Ok(Some(status)) => {
                error!("System command {} failed: {}", child.id(), status);
                false
            },
            Ok(None) => true,
            Err(e) => {
                error!("Failed to poll system command {}: {}", child.id(), e);
                false
            },
        });
        before - self.running.len()
    }
}
