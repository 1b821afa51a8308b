//! Server log watching: new chat lines become [`ChatEvent`]s.

mod parse;
mod tail;

pub use parse::{ChatLine, ChatParser};
pub use tail::LogTailer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{PollWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A chat message seen in one server's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub server: String,
    pub player: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("log file not found: {}", path.display())]
    LogNotFound { path: PathBuf },

    #[error("failed to read log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to watch log file: {0}")]
    Notify(#[from] notify::Error),
}

/// A running log watch. Dropping it stops watching.
pub struct LogWatch {
    _watcher: PollWatcher,
    task: JoinHandle<()>,
}

impl Drop for LogWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Follow `path` and forward every chat line to `events`.
///
/// Only lines appended after the call are reported. The watch ends when the
/// receiving side of `events` is dropped.
pub async fn watch_log(
    server: impl Into<String>,
    path: impl AsRef<Path>,
    parser: ChatParser,
    poll_interval: Duration,
    events: mpsc::Sender<ChatEvent>,
) -> Result<LogWatch, WatchError> {
    let server = server.into();
    let path = path.as_ref().to_path_buf();
    let mut tailer = match LogTailer::open(&path).await {
        Ok(tailer) => tailer,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::LogNotFound { path });
        }
        Err(e) => return Err(e.into()),
    };

    // Capacity 1: bursts of change notifications collapse into one read.
    let (changed_tx, mut changed_rx) = mpsc::channel::<()>(1);
    let handler_server = server.clone();
    let mut watcher = PollWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(_) => {
                let _ = changed_tx.try_send(());
            }
            Err(e) => {
                tracing::warn!(server = %handler_server, error = %e, "log watcher error");
            }
        },
        notify::Config::default().with_poll_interval(poll_interval),
    )?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    tracing::info!(server = %server, path = %path.display(), "watching server log");

    // The poll watcher compares modification times at one second resolution,
    // so appends within the same second are picked up by the periodic sweep.
    let mut sweep = tokio::time::interval(poll_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = changed_rx.recv() => {
                    if changed.is_none() {
                        return;
                    }
                }
                _ = sweep.tick() => {}
            }
            let lines = match tailer.read_new_lines().await {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(server = %server, error = %e, "failed to read server log");
                    continue;
                }
            };
            for line in lines {
                let Some(chat) = parser.parse(&line) else {
                    continue;
                };
                tracing::debug!(server = %server, player = %chat.player, "chat line");
                let event = ChatEvent {
                    server: server.clone(),
                    player: chat.player,
                    message: chat.message,
                };
                if events.send(event).await.is_err() {
                    tracing::debug!(server = %server, "event receiver gone, stopping log watch");
                    return;
                }
            }
        }
    });

    Ok(LogWatch {
        _watcher: watcher,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_CHAT_PATTERN;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn parser() -> ChatParser {
        ChatParser::new(DEFAULT_CHAT_PATTERN).expect("default pattern compiles")
    }

    #[tokio::test]
    async fn missing_log_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, _rx) = mpsc::channel(4);
        let result = watch_log(
            "survival",
            dir.path().join("latest.log"),
            parser(),
            Duration::from_millis(20),
            tx,
        )
        .await;
        assert!(matches!(result, Err(WatchError::LogNotFound { .. })));
    }

    #[tokio::test]
    async fn appended_chat_lines_become_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latest.log");
        std::fs::write(&path, "[12:00:00] [Server thread/INFO]: <Old> ignored\n").expect("seed log");

        let (tx, mut rx) = mpsc::channel(4);
        let _watch = watch_log("survival", &path, parser(), Duration::from_millis(20), tx)
            .await
            .expect("watch starts");

        // Give the poller a baseline scan before the file changes.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut file = OpenOptions::new().append(true).open(&path).expect("open log");
        writeln!(file, "[12:00:01] [Server thread/INFO]: Steve joined the game").expect("append");
        writeln!(file, "[12:00:02] [Server thread/INFO]: <Steve> @gem hello there").expect("append");
        file.sync_all().expect("sync");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        assert_eq!(
            event,
            ChatEvent {
                server: "survival".to_string(),
                player: "Steve".to_string(),
                message: "@gem hello there".to_string(),
            }
        );
    }
}
