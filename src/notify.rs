//! User-facing transient notifications.
//!
//! Failed actions report here instead of printing; the front end decides how
//! to render them.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!(target: "scrivo::notice", "{}", notice.message),
            NoticeLevel::Error => tracing::warn!(target: "scrivo::notice", "{}", notice.message),
        }
    }
}

/// Forwards notices to a receiver owned by the UI.
impl Notifier for mpsc::UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        // a closed receiver means nobody is watching anymore
        let _ = self.send(notice);
    }
}
