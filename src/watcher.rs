// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File system watcher for the settings file

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{BlurwatchError, Result};

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The file was written or had its metadata touched
    Changed(PathBuf),
    /// The file was removed or renamed away; the watch is gone with it
    Removed(PathBuf),
    /// Watcher error
    Error(String),
}

/// Watches exactly one file
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    target: PathBuf,
    event_rx: Receiver<notify::Result<Event>>,
    armed: bool,
}

impl FileWatcher {
    /// Start watching `target`, which must be an existing regular file
    pub fn new(target: &Path) -> Result<Self> {
        check_target(target)?;
        let (tx, rx) = channel();

        let config = Config::default()
            .with_poll_interval(Duration::from_secs(2));

        let mut watcher = RecommendedWatcher::new(tx, config)?;
        watcher.watch(target, RecursiveMode::NonRecursive)?;
        info!("Watching: {:?}", target);

        Ok(Self {
            watcher,
            target: target.to_path_buf(),
            event_rx: rx,
            armed: true,
        })
    }

    /// Get the next event (blocking with timeout)
    pub fn next_event(&self, timeout: Duration) -> Option<WatchEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(Ok(event)) => Self::convert_event(event, &self.target),
            Ok(Err(e)) => Some(WatchEvent::Error(e.to_string())),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => None,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                Some(WatchEvent::Error("Watcher disconnected".to_string()))
            }
        }
    }

    /// Convert notify event to our event type
    fn convert_event(event: Event, target: &Path) -> Option<WatchEvent> {
        let path = event
            .paths
            .first()
            .cloned()
            .unwrap_or_else(|| target.to_path_buf());

        match event.kind {
            EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
            EventKind::Modify(notify::event::ModifyKind::Name(_)) if !path.exists() => {
                Some(WatchEvent::Removed(path))
            }
            EventKind::Access(_) => None,
            _ => Some(WatchEvent::Changed(path)),
        }
    }

    /// Forget the current watch after the file went away
    pub fn disarm(&mut self) {
        if self.armed {
            // The inode is gone, so unwatch failing here is expected
            let _ = self.watcher.unwatch(&self.target);
            self.armed = false;
            debug!("Watch on {:?} dropped", self.target);
        }
    }

    /// Re-add the watch once the file exists again
    ///
    /// Editors that save by writing a new file and renaming it over the old
    /// one leave the original watch pointing at a deleted inode.
    pub fn rearm(&mut self) -> Result<bool> {
        if self.armed || !self.target.is_file() {
            return Ok(false);
        }
        self.watcher.watch(&self.target, RecursiveMode::NonRecursive)?;
        self.armed = true;
        info!("Re-watching: {:?}", self.target);
        Ok(true)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Fail unless `path` is an existing file that is not a directory
pub fn check_target(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Ok(()),
        _ => Err(BlurwatchError::Config(format!(
            "File does not exist or is a directory: {:?}",
            path
        ))),
    }
}

/// Gates repeat runs: after a run fires, triggers inside the cooldown are skipped
///
/// Only fired triggers move the window, so a steady stream of events cannot
/// postpone the next run indefinitely.
#[derive(Debug, Clone)]
pub struct Debouncer {
    cooldown: Duration,
    last_fire: Option<Instant>,
}

impl Debouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fire: None,
        }
    }

    /// Decide whether a trigger at `now` should run, recording it if so
    pub fn should_fire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_fire {
            if last + self.cooldown > now {
                return false;
            }
        }
        self.last_fire = Some(now);
        true
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

/// Block until two size samples `check_interval` apart agree
///
/// Returns false if the file disappears while waiting. Hitting `max_wait`
/// still returns true: a file that keeps growing is read as it stands.
pub async fn wait_for_stable(path: &Path, check_interval: Duration, max_wait: Duration) -> bool {
    let size_of = |p: &Path| std::fs::metadata(p).map(|m| m.len()).ok();
    let deadline = Instant::now() + max_wait;

    let Some(mut previous) = size_of(path) else {
        return false;
    };

    loop {
        tokio::time::sleep(check_interval).await;

        let Some(size) = size_of(path) else {
            debug!("{:?} vanished while settling", path);
            return false;
        };
        if size == previous {
            return true;
        }
        if Instant::now() >= deadline {
            warn!("{:?} still changing after {:?}, reading it now", path, max_wait);
            return true;
        }

        debug!("{:?} still growing ({} bytes)", path, size);
        previous = size;
    }
}
