use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title)
    }

    fn new(level: NotificationLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Fire-and-forget toast channel. Implementations must not panic.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let description = notification.description.as_deref().unwrap_or("");
        match notification.level {
            NotificationLevel::Error => tracing::warn!("{} {}", notification.title, description),
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!("{} {}", notification.title, description)
            }
        }
    }
}

/// Buffers notifications until the presentation layer drains them.
#[derive(Default)]
pub struct ToastQueue {
    pending: Mutex<VecDeque<Notification>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, notification: Notification) {
        TracingNotifier.notify(notification.clone());
        match self.pending.lock() {
            Ok(mut pending) => pending.push_back(notification),
            Err(poisoned) => poisoned.into_inner().push_back(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_queue_drains_in_order() {
        let queue = ToastQueue::new();
        queue.notify(Notification::info("first"));
        queue.notify(Notification::error("second").with_description("details"));

        let drained = queue.drain();

        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].title, "first");
        assert_eq!(drained[1].level, NotificationLevel::Error);
        assert_eq!(drained[1].description.as_deref(), Some("details"));
        assert!(queue.is_empty());
    }

    #[test]
    fn builders_set_level() {
        assert_eq!(Notification::success("ok").level, NotificationLevel::Success);
        assert_eq!(Notification::info("fyi").level, NotificationLevel::Info);
        assert!(Notification::error("bad").description.is_none());
    }
}
