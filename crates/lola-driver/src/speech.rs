//! 语音播报
//!
//! [`FifoSpeech`] 把每条消息作为一行写入 TTS 命名管道（由后台线程完成，不阻塞实时循环）；
//! [`Announcer`] 负责日志记录和与上一条消息的去重。

use crossbeam_channel::{Sender, TrySendError, bounded};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// 语音输出接口（即发即忘）
pub trait Speech: Send {
    fn say(&mut self, text: &str);
}

/// 写入命名管道的语音输出
pub struct FifoSpeech {
    tx: Sender<String>,
}

impl FifoSpeech {
    /// 待写入队列长度，队列满时丢弃新消息
    const QUEUE_CAPACITY: usize = 8;

    pub fn new(fifo: impl Into<PathBuf>) -> std::io::Result<Self> {
        let fifo = fifo.into();
        let (tx, rx) = bounded::<String>(Self::QUEUE_CAPACITY);

        thread::Builder::new()
            .name("lola-tts".into())
            .spawn(move || {
                for text in rx.iter() {
                    if let Err(e) = write_line(&fifo, &text) {
                        warn!("TTS failed: {}", e);
                    }
                }
                debug!("TTS worker exiting");
            })?;

        Ok(Self { tx })
    }
}

fn write_line(fifo: &Path, text: &str) -> std::io::Result<()> {
    let meta = std::fs::metadata(fifo)?;
    if !meta.file_type().is_fifo() {
        return Err(std::io::Error::other(format!(
            "{} is not a named pipe",
            fifo.display()
        )));
    }
    // 每次重新打开，读端按行读取后会关闭管道
    let mut f = OpenOptions::new().write(true).open(fifo)?;
    writeln!(f, "{}", text)
}

impl Speech for FifoSpeech {
    fn say(&mut self, text: &str) {
        match self.tx.try_send(text.to_string()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => warn!("TTS queue full, dropping: {}", text),
            Err(TrySendError::Disconnected(_)) => warn!("TTS worker gone, dropping: {}", text),
        }
    }
}

/// 丢弃所有消息（无语音硬件时使用）
#[derive(Debug, Default)]
pub struct NullSpeech;

impl Speech for NullSpeech {
    fn say(&mut self, _text: &str) {}
}

/// 带日志和去重的播报器
pub struct Announcer {
    speech: Box<dyn Speech>,
    last: Option<String>,
}

impl Announcer {
    pub fn new(speech: Box<dyn Speech>) -> Self {
        Self { speech, last: None }
    }

    /// 播报；与上一条完全相同的消息会被忽略
    pub fn say(&mut self, text: &str) {
        if self.last.as_deref() == Some(text) {
            debug!("[TTS] (repeated) {}", text);
            return;
        }
        info!("[TTS] {}", text);
        self.speech.say(text);
        self.last = Some(text.to_string());
    }
}
