//! Transient, auto-dismissing user notices.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// What a notice reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// An operation completed.
    Success,
    /// Neutral information.
    Info,
    /// An operation failed.
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message shown to the user until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Kind of notice.
    pub kind: NoticeKind,
    /// Text to show.
    pub message: String,
    /// When the notice disappears.
    pub expires_at: Instant,
}

impl Notice {
    /// Whether the notice is gone at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Holds the single current notice.
///
/// Showing a notice replaces the previous one and restarts the dismissal
/// timer.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a notice for `duration` starting at `now`.
    pub fn show(
        &mut self,
        kind: NoticeKind,
        message: impl Into<String>,
        duration: Duration,
        now: Instant,
    ) -> &Notice {
        self.current.insert(Notice {
            kind,
            message: message.into(),
            expires_at: now + duration,
        })
    }

    /// The notice visible at `now`, if any.
    #[must_use]
    pub fn current(&self, now: Instant) -> Option<&Notice> {
        self.current.as_ref().filter(|n| !n.is_expired(now))
    }

    /// When the visible notice expires.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|n| n.expires_at)
    }

    /// Drop the notice if it has expired; returns whether one was dismissed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.current = None;
            true
        } else {
            false
        }
    }
}
