//! Process-wide "data changed" notifications

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

/// Local collections were rewritten; listeners should re-read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChanged;

/// Publish/subscribe hub for [`DataChanged`]. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct DataEvents {
    sender: broadcast::Sender<DataChanged>,
}

impl DataEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChanged> {
        self.sender.subscribe()
    }

    /// Fire and forget; returns how many listeners were notified.
    pub fn notify(&self) -> usize {
        let listeners = self.sender.send(DataChanged).unwrap_or(0);
        tracing::debug!(listeners, "Data changed");
        listeners
    }
}

impl Default for DataEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_is_notified() {
        let events = DataEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        assert_eq!(events.notify(), 2);
        assert_eq!(first.recv().await.unwrap(), DataChanged);
        assert_eq!(second.recv().await.unwrap(), DataChanged);
    }

    #[test]
    fn notify_without_listeners_is_a_no_op() {
        assert_eq!(DataEvents::new().notify(), 0);
    }
}
