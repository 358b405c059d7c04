//! 变更通知广播
//!
//! A thin wrapper over `tokio::sync::broadcast` that filters per subscriber
//! and tracks how many subscriptions are alive.

use shared::{ChangeEvent, ChangeFilter};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// What a subscriber observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSignal {
    /// A matching change was confirmed
    Changed(ChangeEvent),
    /// The subscriber fell behind and `n` events were dropped; state unknown
    Lagged(u64),
}

/// Publisher side of the change feed
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    active: Arc<AtomicUsize>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish a confirmed change; no subscribers is not an error
    pub fn publish(&self, event: ChangeEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(table = %event.table, kind = %event.kind, id = event.id, receivers, "Change published");
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        ChangeSubscription {
            rx: self.tx.subscribe(),
            filter,
            active: self.active.clone(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// One subscriber's filtered view of the feed
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
    active: Arc<AtomicUsize>,
}

impl ChangeSubscription {
    pub fn filter(&self) -> ChangeFilter {
        self.filter
    }

    /// Next matching signal, `None` once the publisher is gone
    pub async fn recv(&mut self) -> Option<FeedSignal> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(FeedSignal::Changed(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Change subscription lagged {n} messages");
                    return Some(FeedSignal::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ChangeKind, ChangeTable};

    #[tokio::test]
    async fn test_subscription_filters_events() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe(ChangeFilter::table(ChangeTable::Transactions));

        feed.publish(ChangeEvent::new(ChangeTable::Customers, ChangeKind::Insert, 1));
        feed.publish(ChangeEvent::new(ChangeTable::Transactions, ChangeKind::Update, 2));

        let signal = sub.recv().await.unwrap();
        assert_eq!(
            signal,
            FeedSignal::Changed(ChangeEvent::new(ChangeTable::Transactions, ChangeKind::Update, 2))
        );
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new(16);
        let a = feed.subscribe(ChangeFilter::any());
        let b = feed.subscribe(ChangeFilter::any());
        assert_eq!(feed.subscriber_count(), 2);
        drop(a);
        assert_eq!(feed.subscriber_count(), 1);
        drop(b);
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(ChangeEvent::new(ChangeTable::Customers, ChangeKind::Insert, 1));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_is_told() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe(ChangeFilter::any());
        for id in 0..5 {
            feed.publish(ChangeEvent::new(ChangeTable::Customers, ChangeKind::Insert, id));
        }
        assert!(matches!(sub.recv().await, Some(FeedSignal::Lagged(_))));
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::new(4);
        let mut sub = feed.subscribe(ChangeFilter::any());
        drop(feed);
        assert_eq!(sub.recv().await, None);
    }
}
