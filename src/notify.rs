use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clock::{Ms, now_ms};
use crate::model::requester_key;

/// A message addressed to one requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub created_at: Ms,
    pub read: bool,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            created_at: now_ms(),
            read: false,
        }
    }
}

/// Write side of the notification subsystem. Must never block or fail the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, requester: &str, notification: Notification);
}

#[derive(Debug)]
pub struct Envelope {
    pub requester: String,
    pub notification: Notification,
}

/// Bounded outbound queue in front of the dispatcher task.
pub struct NotifyHub {
    tx: mpsc::Sender<Envelope>,
}

impl NotifyHub {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationSink for NotifyHub {
    fn notify(&self, requester: &str, notification: Notification) {
        let envelope = Envelope {
            requester: requester.to_string(),
            notification,
        };
        if let Err(e) = self.tx.try_send(envelope) {
            metrics::counter!(crate::observability::NOTIFICATIONS_DROPPED_TOTAL).increment(1);
            warn!("dropping notification for {requester}: {e}");
        }
    }
}

/// Per-requester notification storage, keyed by normalized requester id.
#[derive(Default)]
pub struct Inbox {
    entries: DashMap<String, Vec<Notification>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, requester: &str, notification: Notification) {
        self.entries
            .entry(requester_key(requester))
            .or_default()
            .push(notification);
    }

    /// Unread notifications, oldest first. They are marked read.
    pub fn take_unread(&self, requester: &str) -> Vec<Notification> {
        let Some(mut list) = self.entries.get_mut(&requester_key(requester)) else {
            return Vec::new();
        };
        let mut unread = Vec::new();
        for n in list.iter_mut().filter(|n| !n.read) {
            n.read = true;
            unread.push(n.clone());
        }
        unread
    }

    pub fn all(&self, requester: &str) -> Vec<Notification> {
        self.entries
            .get(&requester_key(requester))
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

/// Drain the queue into the inbox until every sender is gone.
pub async fn run_dispatcher(mut rx: mpsc::Receiver<Envelope>, inbox: std::sync::Arc<Inbox>) {
    while let Some(env) = rx.recv().await {
        debug!("notify {}: {}", env.requester, env.notification.title);
        inbox.push(&env.requester, env.notification);
    }
    debug!("notification dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn hub_delivers_to_receiver() {
        let (hub, mut rx) = NotifyHub::new(4);
        hub.notify("s1", Notification::new("Reservation approved", "ok"));
        let env = rx.recv().await.unwrap();
        assert_eq!(env.requester, "s1");
        assert_eq!(env.notification.title, "Reservation approved");
        assert!(!env.notification.read);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (hub, mut rx) = NotifyHub::new(1);
        hub.notify("s1", Notification::new("first", ""));
        hub.notify("s1", Notification::new("second", ""));
        assert_eq!(rx.recv().await.unwrap().notification.title, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_queue_is_ignored() {
        let (hub, rx) = NotifyHub::new(1);
        drop(rx);
        // No receiver. Must not panic.
        hub.notify("s1", Notification::new("lost", ""));
    }

    #[test]
    fn inbox_take_unread_marks_read() {
        let inbox = Inbox::new();
        inbox.push(" S1 ", Notification::new("a", ""));
        inbox.push("s1", Notification::new("b", ""));

        let unread = inbox.take_unread("s1");
        assert_eq!(unread.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert!(unread.iter().all(|n| n.read));
        assert!(inbox.take_unread("s1").is_empty());
        assert_eq!(inbox.all("S1").len(), 2);
        assert!(inbox.take_unread("s2").is_empty());
    }

    #[tokio::test]
    async fn dispatcher_fills_inbox() {
        let (hub, rx) = NotifyHub::new(8);
        let inbox = Arc::new(Inbox::new());
        let task = tokio::spawn(run_dispatcher(rx, inbox.clone()));

        hub.notify("p7", Notification::new("Reservation modified", "x"));
        drop(hub);
        task.await.unwrap();

        assert_eq!(inbox.all("p7").len(), 1);
    }
}
