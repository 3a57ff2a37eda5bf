//! Transient user-facing notifications.

use std::sync::{Mutex, MutexGuard};

use super::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Queue of toasts waiting to be shown. Views drain it on render.
#[derive(Default)]
pub struct Notifier {
    pending: Mutex<Vec<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, level: NotificationLevel, message: impl Into<String>) {
        self.pending().push(Notification {
            level,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    /// Log a failed action and show its message.
    pub fn report(&self, context: &str, err: &ClientError) {
        match err {
            ClientError::AuthRequired(_) | ClientError::Validation(_) => {
                tracing::debug!(context, error = %err, "Action rejected");
            }
            ClientError::Backend(_) | ClientError::NotFound(_) => {
                tracing::error!(context, error = %err, "Action failed");
            }
        }
        self.error(err.to_string());
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending())
    }

    pub fn last(&self) -> Option<Notification> {
        self.pending().last().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}
