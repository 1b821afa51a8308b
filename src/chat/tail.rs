//! Incremental reading of a growing log file.

use std::io::{self, SeekFrom};
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Reads only what was appended since the last call.
///
/// Starts at the end of the file, so history is never replayed. A line is
/// returned only once its newline has been written. When the file shrinks
/// (truncated or rotated) the tail jumps to the new end and drops any partial
/// line.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    offset: u64,
    carry: Vec<u8>,
}

impl LogTailer {
    /// Open `path`, positioned at its current end.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let offset = tokio::fs::metadata(&path).await?.len();
        Ok(Self {
            path,
            offset,
            carry: Vec::new(),
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Complete lines appended since the previous call.
    pub async fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let len = tokio::fs::metadata(&self.path).await?.len();
        if len < self.offset {
            tracing::debug!(path = %self.path.display(), "log file shrank, following new end");
            self.offset = len;
            self.carry.clear();
            return Ok(Vec::new());
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.take(len - self.offset)
            .read_to_end(&mut appended)
            .await?;
        self.offset += appended.len() as u64;
        self.carry.extend_from_slice(&appended);

        let mut lines = Vec::new();
        while let Some(end) = self.carry.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.carry.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]);
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }
}
