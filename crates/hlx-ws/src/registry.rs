//! Per-channel listener registry.
//!
//! Listeners are kept in registration order under their channel. A listener
//! registered through `subscribe` also records the [`Subscription`] it holds;
//! `ConnectionManager` closes an open feed once no listener holds it.
//!
//! The registry itself is not synchronized; `ConnectionManager` keeps it
//! behind a lock and dispatches to a snapshot taken under that lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::message::{ChannelPayload, Subscription};

/// Callback invoked with each payload on its channel.
pub type Listener = Arc<dyn Fn(&ChannelPayload) + Send + Sync>;

/// Handle returned on registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct Entry {
    id: ListenerId,
    subscription: Option<Subscription>,
    listener: Listener,
}

/// Listener lists keyed by channel name.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, Vec<Entry>>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` on `channel`, optionally holding `subscription`.
    pub fn add(
        &mut self,
        channel: &str,
        subscription: Option<Subscription>,
        listener: Listener,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.channels.entry(channel.to_string()).or_default().push(Entry {
            id,
            subscription,
            listener,
        });
        id
    }

    /// Remove one listener. Returns the subscription it held, if any, wrapped
    /// in `Some` when the listener existed.
    pub fn remove(&mut self, channel: &str, id: ListenerId) -> Option<Option<Subscription>> {
        let entries = self.channels.get_mut(channel)?;
        let pos = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(pos);
        if entries.is_empty() {
            self.channels.remove(channel);
        }
        Some(entry.subscription)
    }

    /// Remove every listener on `channel`. Returns the distinct subscriptions
    /// they held.
    pub fn clear(&mut self, channel: &str) -> Vec<Subscription> {
        let Some(entries) = self.channels.remove(channel) else {
            return Vec::new();
        };
        let mut released: Vec<Subscription> = Vec::new();
        for sub in entries.into_iter().filter_map(|e| e.subscription) {
            if !released.contains(&sub) {
                released.push(sub);
            }
        }
        released
    }

    /// Whether any listener currently holds `subscription`.
    pub fn holds(&self, subscription: &Subscription) -> bool {
        self.channels
            .get(subscription.channel())
            .is_some_and(|entries| {
                entries
                    .iter()
                    .any(|e| e.subscription.as_ref() == Some(subscription))
            })
    }

    /// Listeners on `channel`, in registration order.
    pub fn snapshot(&self, channel: &str) -> Vec<Listener> {
        self.channels
            .get(channel)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.listener)).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> Listener {
        Arc::new(|_: &ChannelPayload| {})
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            registry.add(
                "trades",
                None,
                Arc::new(move |_: &ChannelPayload| order.lock().push(i)),
            );
        }

        let payload = ChannelPayload::Trades(vec![]);
        for listener in registry.snapshot("trades") {
            listener(&payload);
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_only_target_listener() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();
        let a = registry.add("allMids", None, noop());
        let counted = Arc::clone(&calls);
        registry.add(
            "allMids",
            None,
            Arc::new(move |_: &ChannelPayload| {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(registry.remove("allMids", a), Some(None));
        assert_eq!(registry.remove("allMids", a), None);
        assert_eq!(registry.listener_count("allMids"), 1);

        for listener in registry.snapshot("allMids") {
            listener(&ChannelPayload::Error(String::new()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_holds_tracks_last_holder() {
        let btc = Subscription::trades("BTC");
        let mut registry = SubscriptionRegistry::new();
        let first = registry.add("trades", Some(btc.clone()), noop());
        let second = registry.add("trades", Some(btc.clone()), noop());
        registry.add("trades", Some(Subscription::trades("ETH")), noop());

        assert!(registry.holds(&btc));
        registry.remove("trades", first);
        assert!(registry.holds(&btc));
        assert_eq!(registry.remove("trades", second), Some(Some(btc.clone())));
        assert!(!registry.holds(&btc));
        assert!(registry.holds(&Subscription::trades("ETH")));
    }

    #[test]
    fn test_clear_releases_distinct_subscriptions() {
        let mut registry = SubscriptionRegistry::new();
        registry.add("trades", Some(Subscription::trades("BTC")), noop());
        registry.add("trades", Some(Subscription::trades("BTC")), noop());
        registry.add("trades", Some(Subscription::trades("ETH")), noop());
        registry.add("trades", None, noop());

        let released = registry.clear("trades");
        assert_eq!(
            released,
            vec![Subscription::trades("BTC"), Subscription::trades("ETH")]
        );
        assert_eq!(registry.listener_count("trades"), 0);
        assert!(!registry.holds(&Subscription::trades("BTC")));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = SubscriptionRegistry::new();
        let a = registry.add("x", None, noop());
        let b = registry.add("y", None, noop());
        assert_ne!(a, b);
    }
}
