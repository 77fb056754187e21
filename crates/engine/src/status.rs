use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Local;
use tracing::info;

use common::{MonitorSink, Progress};

const DEFAULT_CAPACITY: usize = 200;

/// In-memory progress and log sink read by the operator surface.
#[derive(Debug)]
pub struct StatusBoard {
    progress: Mutex<Progress>,
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl StatusBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            progress: Mutex::new(Progress::default()),
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn progress_snapshot(&self) -> Progress {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Up to `n` most recent log lines, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().skip(lines.len().saturating_sub(n)).cloned().collect()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MonitorSink for StatusBoard {
    fn progress(&self, done: usize, total: usize) {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner()) = Progress { done, total };
    }

    fn log(&self, message: &str) {
        info!(target: "monitor", "{message}");
        let line = format!("{} {message}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}
