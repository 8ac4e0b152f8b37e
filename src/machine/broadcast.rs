//! Multicast streams backed by unbounded channels.
//!
//! Publishing never blocks and never runs subscriber code, so it is safe
//! to publish from inside the transition pipeline. Subscribers read at
//! their own pace, either synchronously with [`Subscription::try_next`]
//! or from async code with [`Subscription::next`].

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Fan-out of values to every live subscriber.
#[derive(Debug)]
pub struct Broadcast<T> {
    subscribers: Vec<UnboundedSender<T>>,
    closed: bool,
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            closed: false,
        }
    }

    /// Subscribe to values published from now on. Subscribing to a closed
    /// broadcast yields an already completed subscription.
    pub fn subscribe(&mut self) -> Subscription<T> {
        self.subscribe_with(None)
    }

    fn subscribe_with(&mut self, replay: Option<T>) -> Subscription<T> {
        let (sender, receiver) = unbounded_channel();
        if let Some(value) = replay {
            let _ = sender.send(value);
        }
        if !self.closed {
            self.subscribers.push(sender);
        }
        Subscription::new(receiver)
    }

    /// Deliver `value` to every subscriber, forgetting dropped ones.
    pub fn publish(&mut self, value: T) {
        if self.closed {
            return;
        }
        self.subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
    }

    /// Complete every subscription. Later publishes are ignored.
    pub fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T: Clone> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holder of a current value: new subscribers get it immediately, then
/// every later value.
#[derive(Debug)]
pub struct LatestValue<T> {
    current: T,
    channel: Broadcast<T>,
}

impl<T: Clone> LatestValue<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            channel: Broadcast::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    /// Replace and publish the current value. Ignored once closed.
    pub fn set(&mut self, value: T) {
        if self.channel.is_closed() {
            return;
        }
        self.current = value.clone();
        self.channel.publish(value);
    }

    pub fn subscribe(&mut self) -> Subscription<T> {
        let current = self.current.clone();
        self.channel.subscribe_with(Some(current))
    }

    pub fn close(&mut self) {
        self.channel.close();
    }
}

/// Receiving end of a [`Broadcast`] or [`LatestValue`].
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: UnboundedReceiver<T>,
    peeked: Option<T>,
}

impl<T> Subscription<T> {
    fn new(receiver: UnboundedReceiver<T>) -> Self {
        Self {
            receiver,
            peeked: None,
        }
    }

    /// A subscription that yields `value` and completes.
    pub fn once(value: T) -> Self {
        let (sender, receiver) = unbounded_channel();
        let _ = sender.send(value);
        Self::new(receiver)
    }

    /// Next buffered value, if any.
    pub fn try_next(&mut self) -> Option<T> {
        self.peeked
            .take()
            .or_else(|| self.receiver.try_recv().ok())
    }

    /// Every buffered value, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// True once the source has completed and every value was consumed.
    pub fn is_completed(&mut self) -> bool {
        if self.peeked.is_some() {
            return false;
        }
        match self.receiver.try_recv() {
            Ok(value) => {
                self.peeked = Some(value);
                false
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => true,
        }
    }

    /// Wait for the next value. `None` once the source has completed.
    pub async fn next(&mut self) -> Option<T> {
        match self.peeked.take() {
            Some(value) => Some(value),
            None => self.receiver.recv().await,
        }
    }
}
