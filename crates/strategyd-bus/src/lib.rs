//! The Trade-Event Bus (C1): a process-wide, single-threaded
//! publish/subscribe channel for [`TradeSuccessEvent`]s.
//!
//! No persistence, no replay, no backpressure — at-most-once local
//! delivery, lost across process restarts. `publish` delivers to every
//! current subscriber synchronously within the publisher's call; a
//! listener that needs to publish as a side effect must not call
//! `publish` directly (it would recurse) — instead this bus defers such
//! nested publishes onto a per-thread queue drained once the outer
//! `publish` call returns, so it can never re-enter transitively.

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use strategyd_core::TradeSuccessEvent;
use tracing::trace;

pub type Listener = Arc<dyn Fn(&TradeSuccessEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(u64, Listener)>>,
    publishing: AtomicBool,
}

thread_local! {
    static DEFERRED: RefCell<VecDeque<TradeSuccessEvent>> = RefCell::new(VecDeque::new());
}

/// A cheaply-clonable handle to the bus; every worker holds one.
#[derive(Clone)]
pub struct TradeEventBus(Arc<Inner>);

impl TradeEventBus {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
            publishing: AtomicBool::new(false),
        }))
    }

    /// Registers a listener, returning a handle that must be released with
    /// [`Self::unsubscribe`] on the subscriber's stop path.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TradeSuccessEvent) + Send + Sync + 'static,
    {
        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        self.0.subscribers.write().push((id, Arc::new(listener)));
        SubscriptionId(id)
    }

    /// Removes a listener. Idempotent: unsubscribing an unknown or
    /// already-removed id is not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.0.subscribers.write().retain(|(sub_id, _)| *sub_id != id.0);
    }

    /// Delivers `event` to every current subscriber. If called re-entrantly
    /// from within a listener's callback, the event is deferred and
    /// delivered after the outer publish completes.
    pub fn publish(&self, event: TradeSuccessEvent) {
        if self.0.publishing.swap(true, Ordering::SeqCst) {
            // Already publishing on this call stack - defer.
            self.0.publishing.store(true, Ordering::SeqCst);
            DEFERRED.with(|q| q.borrow_mut().push_back(event));
            return;
        }

        self.deliver(&event);

        loop {
            let next = DEFERRED.with(|q| q.borrow_mut().pop_front());
            match next {
                Some(deferred_event) => self.deliver(&deferred_event),
                None => break,
            }
        }

        self.0.publishing.store(false, Ordering::SeqCst);
    }

    fn deliver(&self, event: &TradeSuccessEvent) {
        // Clone the subscriber list out from under the lock so a listener
        // that subscribes/unsubscribes during delivery can't deadlock.
        let subscribers = self.0.subscribers.read().clone();
        trace!(count = subscribers.len(), "delivering trade event");
        for (_, listener) in subscribers.iter() {
            listener(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.read().len()
    }
}

impl Default for TradeEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use strategyd_core::StrategyKind;

    fn sample_event() -> TradeSuccessEvent {
        TradeSuccessEvent {
            strategy_id: "s1".into(),
            trading_wallet_pubkey: "wallet".into(),
            strategy_kind: StrategyKind::Levels,
            signature: "sig".into(),
            timestamp: Utc::now(),
            amount: Some(100),
            profit: None,
        }
    }

    #[test]
    fn subscribe_and_publish_delivers_to_all() {
        let bus = TradeEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        let c2 = count.clone();
        bus.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        bus.subscribe(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent_and_stops_delivery() {
        let bus = TradeEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        let id = bus.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });

        bus.unsubscribe(id);
        bus.unsubscribe(id); // second call must not panic or error

        bus.publish(sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_publish_is_deferred_not_reentrant() {
        let bus = TradeEventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let bus_clone = bus.clone();
        let order_a = order.clone();
        bus.subscribe(move |event| {
            order_a.lock().push(format!("outer:{}", event.signature));
            // Side-effect publish from within a handler must defer, not
            // recurse into `deliver` while the lock/flag are held.
            bus_clone.publish(TradeSuccessEvent {
                signature: "inner".into(),
                ..sample_event()
            });
        });
        let order_b = order.clone();
        bus.subscribe(move |event| {
            order_b.lock().push(format!("inner-listener:{}", event.signature));
        });

        bus.publish(sample_event());

        let log = order.lock();
        // Outer event is fully delivered to both listeners before the
        // deferred inner event is delivered.
        assert_eq!(log[0], "outer:sig");
        assert_eq!(log[1], "inner-listener:sig");
        assert_eq!(log[2], "inner-listener:inner");
    }
}
