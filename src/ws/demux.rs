//! Routes inbound frames to per-channel bounded queues.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One raw inbound frame, shared by every subscriber of its channel.
pub type Frame = Arc<[u8]>;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct FrameHead<'a> {
    #[serde(borrow)]
    channel: Cow<'a, str>,
}

/// What happened to one routed frame.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RouteOutcome {
    pub delivered: usize,
    /// Subscribers whose queue was full.
    pub dropped: usize,
    /// Subscribers whose receiver was gone; they are removed.
    pub pruned: usize,
}

/// Registry of channel name → subscriber queues.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone, Debug)]
pub struct Demultiplexer {
    routes: Arc<DashMap<String, Vec<mpsc::Sender<Frame>>>>,
    capacity: usize,
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Demultiplexer {
    /// `capacity` is the queue depth of each subscription; zero is bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            routes: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds a subscriber queue for `channel`.
    pub fn register(&self, channel: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.routes
            .entry(channel.to_owned())
            .or_default()
            .push(sender);

        Subscription {
            channel: channel.to_owned(),
            receiver,
        }
    }

    /// Drops every subscriber queue of `channel`. Returns whether any existed.
    pub fn remove(&self, channel: &str) -> bool {
        self.routes.remove(channel).is_some()
    }

    /// Removes queues of `channel` whose receiver was dropped.
    pub fn prune(&self, channel: &str) {
        if let Some(mut senders) = self.routes.get_mut(channel) {
            senders.retain(|sender| !sender.is_closed());
        }
        self.routes.remove_if(channel, |_, senders| senders.is_empty());
    }

    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.routes.get(channel).map_or(0, |senders| senders.len())
    }

    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.routes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Delivers `frame` to every queue registered for its `channel` field.
    ///
    /// Never waits: a full queue loses this frame, a closed one is pruned.
    /// Frames without a readable `channel` are ignored.
    pub fn route(&self, frame: &[u8]) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();
        let Ok(head) = serde_json::from_slice::<FrameHead<'_>>(frame) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(len = frame.len(), "frame without channel ignored");
            return outcome;
        };
        let channel = head.channel.as_ref();

        {
            let Some(mut senders) = self.routes.get_mut(channel) else {
                return outcome;
            };
            let shared: Frame = Arc::from(frame);
            senders.retain(|sender| match sender.try_send(Arc::clone(&shared)) {
                Ok(()) => {
                    outcome.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    outcome.dropped += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    outcome.pruned += 1;
                    false
                }
            });
        }

        if outcome.pruned > 0 {
            self.routes.remove_if(channel, |_, senders| senders.is_empty());
        }

        #[cfg(feature = "tracing")]
        if outcome.dropped > 0 {
            tracing::debug!(%channel, dropped = outcome.dropped, "subscriber queue full, frame dropped");
        }

        outcome
    }
}

/// Receiving end of one channel subscription.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next frame; `None` once the channel was unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Next frame, or `None` if nothing arrives within `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Frame> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// [`Self::recv_timeout`] with a 5 second bound.
    pub async fn recv_first(&mut self) -> Option<Frame> {
        self.recv_timeout(DEFAULT_FIRST_FRAME_TIMEOUT).await
    }

    pub fn into_stream(self) -> impl Stream<Item = Frame> {
        let mut receiver = self.receiver;
        async_stream::stream! {
            while let Some(frame) = receiver.recv().await {
                yield frame;
            }
        }
    }
}
