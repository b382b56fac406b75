// Status events pushed from the download worker to whatever front end is
// listening. Sends are fire-and-forget: a closed receiver is not an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub message: String,
    pub level: StatusLevel,
    /// Download progress in percent, when the tool reports one
    pub percent: Option<f32>,
}

impl StatusEvent {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            percent: None,
        }
    }

    pub fn progress(percent: f32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: StatusLevel::Info,
            percent: Some(percent),
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            StatusLevel::Info | StatusLevel::Success => f.write_str(&self.message),
            StatusLevel::Warning => write!(f, "Warning: {}", self.message),
            StatusLevel::Error => write!(f, "Error: {}", self.message),
        }
    }
}

type ConsoleWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Sending half of the status channel. Every event is also logged.
///
/// A console emitter writes each event as a line instead and keeps
/// tracing at debug level for info and success events.
#[derive(Clone, Default)]
pub struct StatusEmitter {
    tx: Option<UnboundedSender<StatusEvent>>,
    console: Option<ConsoleWriter>,
}

impl fmt::Debug for StatusEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusEmitter")
            .field("channel", &self.tx.is_some())
            .field("console", &self.console.is_some())
            .finish()
    }
}

impl StatusEmitter {
    pub fn channel() -> (Self, UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(tx),
                console: None,
            },
            rx,
        )
    }

    /// An emitter that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    /// An emitter that prints every event to stdout.
    pub fn console() -> Self {
        Self::writer(std::io::stdout())
    }

    pub fn writer(out: impl Write + Send + 'static) -> Self {
        Self {
            tx: None,
            console: Some(Arc::new(Mutex::new(Box::new(out)))),
        }
    }

    pub fn emit(&self, event: StatusEvent) {
        if let Some(console) = &self.console {
            if let Ok(mut out) = console.lock() {
                let _ = writeln!(out, "{}", event);
                let _ = out.flush();
            }
        }

        match event.level {
            StatusLevel::Info | StatusLevel::Success => match event.percent {
                Some(percent) => debug!(percent, "{}", event.message),
                None if self.console.is_some() => debug!("{}", event.message),
                None => info!("{}", event.message),
            },
            StatusLevel::Warning => warn!("{}", event.message),
            StatusLevel::Error => error!("{}", event.message),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Info, message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Success, message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Error, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (emitter, mut rx) = StatusEmitter::channel();
        emitter.info("fetching");
        emitter.emit(StatusEvent::progress(12.5, "12.5%"));
        emitter.success("done");
        drop(emitter);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].level, StatusLevel::Info);
        assert_eq!(events[1].percent, Some(12.5));
        assert_eq!(events[2], StatusEvent::new(StatusLevel::Success, "done"));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_emitter_prints_every_event() {
        let buf = SharedBuf::default();
        let emitter = StatusEmitter::writer(buf.clone());
        emitter.info("Available tools: yt-dlp=[OK], ffmpeg=[X]");
        emitter.info("Manifest URL: https://cdn.example/index.m3u8");
        emitter.warn("manifest has no .m3u8 suffix");
        emitter.error("Download failed");

        let printed = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            printed,
            "Available tools: yt-dlp=[OK], ffmpeg=[X]\n\
             Manifest URL: https://cdn.example/index.m3u8\n\
             Warning: manifest has no .m3u8 suffix\n\
             Error: Download failed\n"
        );
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_ignored() {
        let (emitter, rx) = StatusEmitter::channel();
        drop(rx);
        emitter.error("nobody is listening");
        StatusEmitter::silent().warn("nor here");
    }
}
