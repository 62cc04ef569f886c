//! Latest-value replay broadcast.
//!
//! A [`LatestHub`] retains the most recent published value and a list of
//! subscriber channels. New subscribers immediately receive the retained
//! value (if any), then every subsequent publish. Delivery never blocks
//! the publisher: a full subscriber buffer gets exactly one retry, after
//! which that emission is dropped for that subscriber only. Disconnected
//! subscribers are pruned on the next publish.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Per-subscriber buffer size. Slow subscribers lose emissions rather
/// than stall the publisher.
const SUBSCRIBER_BUFFER: usize = 32;

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Subscriber<T> {
    sender: Sender<T>,
    filter: Option<Filter<T>>,
}

impl<T> Subscriber<T> {
    fn accepts(&self, value: &T) -> bool {
        self.filter.as_ref().map_or(true, |f| f(value))
    }
}

/// Single-slot mailbox plus listener list.
pub struct LatestHub<T> {
    inner: Mutex<HubInner<T>>,
}

struct HubInner<T> {
    latest: Option<T>,
    subscribers: Vec<Subscriber<T>>,
}

impl<T: Clone> LatestHub<T> {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                latest: None,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Publish a value: retain it and fan it out to matching subscribers.
    pub fn publish(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.latest = Some(value.clone());
        inner.subscribers.retain(|subscriber| {
            if !subscriber.accepts(&value) {
                return true;
            }
            deliver(&subscriber.sender, value.clone())
        });
    }

    /// Drop the retained value so future subscribers start empty.
    pub fn clear_latest(&self) {
        self.inner.lock().latest = None;
    }

    /// Subscribe to every future publish, with immediate latest-replay.
    pub fn subscribe(&self) -> Receiver<T> {
        self.subscribe_with(None)
    }

    /// Subscribe with a sender-side filter predicate.
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Receiver<T> {
        self.subscribe_with(Some(Box::new(filter)))
    }

    fn subscribe_with(&self, filter: Option<Filter<T>>) -> Receiver<T> {
        let (sender, receiver) = bounded(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();

        let subscriber = Subscriber { sender, filter };
        if let Some(latest) = &inner.latest {
            if subscriber.accepts(latest) {
                // Fresh channel; the buffer cannot be full yet.
                let _ = subscriber.sender.try_send(latest.clone());
            }
        }
        inner.subscribers.push(subscriber);
        receiver
    }

    /// Number of live subscribers (for tests and diagnostics)
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T: Clone> Default for LatestHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking send with one retry. Returns false when the subscriber
/// disconnected and should be pruned.
fn deliver<T>(sender: &Sender<T>, value: T) -> bool {
    match sender.try_send(value) {
        Ok(()) => true,
        Err(TrySendError::Disconnected(_)) => false,
        Err(TrySendError::Full(value)) => match sender.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) => false,
            // Still full after the retry: drop this emission for this
            // subscriber and keep the subscription alive.
            Err(TrySendError::Full(_)) => true,
        },
    }
}
