// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Rendezvous Channel
//!
//! A named pipe in a private temporary directory. It gives the two tasks
//! the properties the export relies on:
//! 1. Opening one end blocks until the other end is opened.
//! 2. Writes block once the kernel buffer is full (backpressure).
//!
//! The channel owns its `TempDir`, so the FIFO and its directory are
//! removed when the channel is closed or dropped, on every exit path.

use crate::domain::errors::{ExportError, Result};
use log::debug;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Named-pipe channel exclusively owned by one export.
#[derive(Debug)]
pub struct RendezvousChannel {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl RendezvousChannel {
    /// Allocates a fresh temporary directory and creates `fifo{suffix}` in it.
    pub fn create(suffix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("stx-").tempdir()?;
        let path = dir.path().join(format!("fifo{}", suffix));
        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR)?;
        debug!("Created rendezvous channel {:?}", path);
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Existence check only; the FIFO is never opened or sized here.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Removes the FIFO and its directory, reporting any failure.
    pub fn close(mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            debug!("Removing rendezvous channel {:?}", self.path);
            dir.close()?;
        }
        Ok(())
    }
}

/// Polls for `path` to exist, `attempts` times `interval` apart.
pub fn await_channel(path: &Path, attempts: u32, interval: Duration) -> Result<()> {
    for attempt in 0..attempts {
        if path.exists() {
            debug!("Channel {:?} present after {} poll(s)", path, attempt + 1);
            return Ok(());
        }
        thread::sleep(interval);
    }
    if path.exists() {
        return Ok(());
    }
    Err(ExportError::ChannelNotCreatedError {
        path: path.to_path_buf(),
        waited_ms: interval.as_millis() as u64 * attempts as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::{Read, Write};
    use std::os::unix::fs::FileTypeExt;

    #[test]
    fn test_create_makes_fifo() {
        let channel = RendezvousChannel::create(".json.lzo").unwrap();
        assert!(channel.exists());
        assert!(channel.path().to_str().unwrap().ends_with("fifo.json.lzo"));
        let meta = std::fs::symlink_metadata(channel.path()).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[test]
    fn test_close_removes_directory() {
        let channel = RendezvousChannel::create("").unwrap();
        let dir = channel.path().parent().unwrap().to_path_buf();
        channel.close().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let dir = {
            let channel = RendezvousChannel::create("").unwrap();
            channel.path().parent().unwrap().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_channels_are_distinct() {
        let a = RendezvousChannel::create("").unwrap();
        let b = RendezvousChannel::create("").unwrap();
        assert_ne!(a.path().parent(), b.path().parent());
    }

    #[test]
    fn test_bytes_pass_in_order() {
        let channel = RendezvousChannel::create("").unwrap();
        let path = channel.path().to_path_buf();

        // Opening the write end blocks until the reader below opens.
        let writer = thread::spawn(move || {
            let mut f = OpenOptions::new().write(true).open(&path).unwrap();
            for i in 0..1000 {
                writeln!(f, "row {}", i).unwrap();
            }
        });

        let mut content = String::new();
        std::fs::File::open(channel.path())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        writer.join().unwrap();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines[0], "row 0");
        assert_eq!(lines[999], "row 999");
    }

    #[test]
    fn test_await_channel_present() {
        let channel = RendezvousChannel::create("").unwrap();
        await_channel(channel.path(), 3, Duration::from_millis(1)).unwrap();
    }

    #[test]
    fn test_await_channel_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("fifo");
        let err = await_channel(&missing, 3, Duration::from_millis(5)).unwrap_err();
        match err {
            ExportError::ChannelNotCreatedError { path, waited_ms } => {
                assert_eq!(path, missing);
                assert_eq!(waited_ms, 15);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
