//! User-facing notifications
//!
//! Components report outcomes through an injected [`NotificationSink`].
//! Messages are translation keys; rendering and localization belong to the
//! sink's owner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use uuid::Uuid;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
    Info,
}

impl NotificationKind {
    /// How long a notification of this kind stays visible
    pub fn delay(&self) -> Duration {
        match self {
            NotificationKind::Success => Duration::from_millis(5_000),
            NotificationKind::Error => Duration::from_millis(15_000),
            NotificationKind::Info => Duration::from_millis(3_000),
            NotificationKind::Warning => Duration::from_millis(10_000),
        }
    }
}

/// Translatable message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    DataNotLoaded,
    ValidationErrorsOccured,
    Saved,
    SavingFailed,
    PleaseChoose,
    LimitedString { min: usize, max: usize },
    Custom(String),
}

impl MessageKey {
    /// Translation key
    pub fn key(&self) -> &str {
        match self {
            MessageKey::DataNotLoaded => "dataNotLoaded",
            MessageKey::ValidationErrorsOccured => "validationErrorsOccured",
            MessageKey::Saved => "saved",
            MessageKey::SavingFailed => "savingFailed",
            MessageKey::PleaseChoose => "pleaseChoose",
            MessageKey::LimitedString { .. } => "errorLimitedString",
            MessageKey::Custom(key) => key,
        }
    }

    /// Interpolation parameters
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            MessageKey::LimitedString { min, max } => {
                vec![("min", min.to_string()), ("max", max.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A queued notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: MessageKey,
    pub delay: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: MessageKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message,
            delay: kind.delay(),
        }
    }
}

/// Receiver of user-facing notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn error(&self, message: MessageKey) {
        self.notify(Notification::new(NotificationKind::Error, message));
    }

    fn success(&self, message: MessageKey) {
        self.notify(Notification::new(NotificationKind::Success, message));
    }
}

/// In-memory notification list
///
/// Each notification removes itself once its delay has elapsed, provided a
/// tokio runtime is running.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible notifications, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    pub fn remove(&self, id: Uuid) {
        self.notifications.write().retain(|n| n.id != id);
    }

    pub fn clear(&self) {
        self.notifications.write().clear();
    }

    pub fn len(&self) -> usize {
        self.notifications.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.read().is_empty()
    }
}

impl NotificationSink for NotificationStore {
    fn notify(&self, notification: Notification) {
        tracing::debug!(
            kind = ?notification.kind,
            message = %notification.message,
            "Notification added"
        );
        let id = notification.id;
        let delay = notification.delay;
        self.notifications.write().push(notification);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.clone();
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                store.remove(id);
            });
        }
    }
}
