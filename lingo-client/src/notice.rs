use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A short, non-blocking message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

/// Shared queue of notices waiting to be shown. Clones share the queue.
#[derive(Clone, Debug, Default)]
pub struct Notices {
    queue: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn success(&self, text: impl Into<String>) {
        self.push(Level::Success, text.into());
    }
    pub fn error(&self, text: impl Into<String>) {
        self.push(Level::Error, text.into());
    }
    fn push(&self, level: Level, text: String) {
        debug!(?level, %text, "notice");
        self.queue.lock().push_back(Notice { level, text });
    }
    /// Takes every queued notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.queue.lock().drain(..).collect()
    }
}
