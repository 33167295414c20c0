//! # LoLA Backend
//!
//! NAO 机器人上的 LoLA 桥接进程。
//!
//! ```bash
//! # 真机：UNIX 套接字 /tmp/robocup
//! lola-backend
//!
//! # 仿真器：TCP
//! lola-backend --tcp --endpoint 10000
//! lola-backend --tcp --endpoint 192.168.1.10:10000
//!
//! # Docker 中的仿真：从 LOLA_PORT / SIMULATOR_HOST 读取地址
//! lola-backend --docker
//! ```
//!
//! 退出码：正常停止或关机为 0，配置错误或致命协议错误为 1。

use anyhow::{Context, Result};
use clap::Parser;
use lola_driver::{BridgeBuilder, BridgeConfig, BridgeExit, FifoSpeech, NullSpeech, Speech};
use lola_link::socket::DEFAULT_TCP_ADDR;
use lola_link::{LolaEndpoint, RunFlag, SocketLink};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// LoLA 桥接
#[derive(Parser, Debug)]
#[command(name = "lola-backend")]
#[command(about = "Bridge between the NAO LoLA hardware socket and the frontend", long_about = None)]
#[command(version)]
struct Args {
    /// 使用 TCP 代替 UNIX 套接字
    #[arg(short, long)]
    tcp: bool,

    /// 连接地址
    ///
    /// UNIX: 套接字路径（默认 /tmp/robocup）
    /// TCP: 端口或 IP:PORT（默认 127.0.0.1:10000）
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Docker 仿真模式，从环境变量 LOLA_PORT 和 SIMULATOR_HOST 读取地址
    #[arg(long)]
    docker: bool,

    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// 根据命令行参数选择连接地址
///
/// `env` 用于读取环境变量（测试中注入）。
fn resolve_endpoint(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<LolaEndpoint> {
    if args.docker {
        let port = env("LOLA_PORT")
            .filter(|v| !v.is_empty())
            .context("set LOLA_PORT environment variable for docker mode")?;
        let host = env("SIMULATOR_HOST")
            .filter(|v| !v.is_empty())
            .context("set SIMULATOR_HOST environment variable for docker mode")?;
        return Ok(LolaEndpoint::tcp(&format!("{}:{}", host, port))?);
    }

    if args.tcp {
        let addr = args.endpoint.as_deref().unwrap_or(DEFAULT_TCP_ADDR);
        return Ok(LolaEndpoint::tcp(addr)?);
    }

    Ok(match &args.endpoint {
        Some(path) => LolaEndpoint::unix(path),
        None => LolaEndpoint::default(),
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

fn run(args: Args) -> Result<BridgeExit> {
    let config = load_config(args.config.as_ref())?;
    let endpoint = resolve_endpoint(&args, |key| std::env::var(key).ok())?;

    let running = RunFlag::new();
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Received termination signal, stopping");
        handler_flag.stop();
    })
    .context("Failed to set signal handler")?;

    let speech: Box<dyn Speech> = match FifoSpeech::new(&config.system.tts_fifo) {
        Ok(speech) => Box::new(speech),
        Err(e) => {
            warn!("Speech output disabled: {}", e);
            Box::new(NullSpeech)
        },
    };

    let link = SocketLink::new(endpoint.clone()).with_receive_timeout(config.link.receive_timeout());
    let mut bridge = BridgeBuilder::new(link, config)
        .run_flag(running)
        .speech(speech)
        .build()?;

    info!("Running LoLA connector on {}", endpoint);
    let result = bridge.run();

    let stats = bridge.metrics().snapshot();
    info!(
        "LoLA connector stopped: {} frames received, {} dropped ({:.2}%), {} sent, {} reconnects",
        stats.frames_received,
        stats.frames_dropped,
        stats.drop_rate(),
        stats.frames_sent,
        stats.reconnects
    );

    Ok(result?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(exit) => {
            info!("Exit: {:?}", exit);
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("lola-backend").chain(argv.iter().copied()))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_endpoint_is_unix_socket() {
        let ep = resolve_endpoint(&args(&[]), no_env).unwrap();
        assert_eq!(ep, LolaEndpoint::unix("/tmp/robocup"));

        let ep = resolve_endpoint(&args(&["--endpoint", "/tmp/lola"]), no_env).unwrap();
        assert_eq!(ep, LolaEndpoint::unix("/tmp/lola"));
    }

    #[test]
    fn test_tcp_endpoint() {
        let ep = resolve_endpoint(&args(&["--tcp"]), no_env).unwrap();
        assert_eq!(ep, LolaEndpoint::Tcp("127.0.0.1:10000".into()));

        let ep = resolve_endpoint(&args(&["-t", "-e", "10001"]), no_env).unwrap();
        assert_eq!(ep, LolaEndpoint::Tcp("127.0.0.1:10001".into()));

        let ep = resolve_endpoint(&args(&["--tcp", "--endpoint", "10.0.0.2:9000"]), no_env).unwrap();
        assert_eq!(ep, LolaEndpoint::Tcp("10.0.0.2:9000".into()));

        assert!(resolve_endpoint(&args(&["--tcp", "--endpoint", "nonsense"]), no_env).is_err());
    }

    #[test]
    fn test_docker_endpoint_from_env() {
        let env = HashMap::from([("LOLA_PORT", "10020"), ("SIMULATOR_HOST", "172.17.0.1")]);
        let ep = resolve_endpoint(&args(&["--docker"]), |k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(ep, LolaEndpoint::Tcp("172.17.0.1:10020".into()));

        let err = resolve_endpoint(&args(&["--docker"]), no_env).unwrap_err();
        assert!(err.to_string().contains("LOLA_PORT"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/lola.toml");
        assert!(load_config(Some(&path)).is_err());
        assert_eq!(load_config(None).unwrap(), BridgeConfig::default());
    }
}
