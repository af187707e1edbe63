//! Event delivery between the poller task and its consumer.
//!
//! The channel flavour follows the [`BackpressurePolicy`]:
//!
//! - `BlockWithDeadline`: bounded `mpsc`; the poller waits up to the deadline
//!   for room and drops the event it was sending when the deadline expires.
//! - `DropOldest`: `broadcast` ring; the poller never waits and a lagging
//!   consumer loses the oldest queued events.

use crate::config::BackpressurePolicy;
use crate::poller::PollerExit;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use turnstile_core::Event;

/// Outcome of handing one event to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    Dropped,
    Closed,
}

/// Sending half, owned by the poller task.
#[derive(Debug)]
pub(crate) enum EventSink {
    Bounded {
        tx: mpsc::Sender<Event>,
        deadline: Duration,
    },
    Ring(broadcast::Sender<Event>),
}

impl EventSink {
    /// Send one event according to the backpressure policy.
    pub(crate) async fn send(&self, event: Event) -> Delivery {
        match self {
            Self::Bounded { tx, deadline } => match tx.send_timeout(event, *deadline).await {
                Ok(()) => Delivery::Delivered,
                Err(mpsc::error::SendTimeoutError::Timeout(event)) => {
                    warn!(
                        event = %event.kind(),
                        deadline_ms = deadline.as_millis() as u64,
                        "timeout sending event"
                    );
                    Delivery::Dropped
                }
                Err(mpsc::error::SendTimeoutError::Closed(_)) => Delivery::Closed,
            },
            Self::Ring(tx) => match tx.send(event) {
                Ok(_) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
        }
    }

    /// Whether the consumer has gone away.
    pub(crate) fn is_closed(&self) -> bool {
        match self {
            Self::Bounded { tx, .. } => tx.is_closed(),
            Self::Ring(tx) => tx.receiver_count() == 0,
        }
    }
}

#[derive(Debug)]
enum StreamInner {
    Bounded(mpsc::Receiver<Event>),
    Ring(broadcast::Receiver<Event>),
}

/// Receiving half of the event channel.
#[derive(Debug)]
pub struct EventStream {
    inner: StreamInner,
    lost: u64,
}

impl EventStream {
    /// Receive the next event.
    ///
    /// Returns `None` once the poller has stopped and every queued event has
    /// been received.
    pub async fn recv(&mut self) -> Option<Event> {
        match &mut self.inner {
            StreamInner::Bounded(rx) => rx.recv().await,
            StreamInner::Ring(rx) => loop {
                match rx.recv().await {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(lost = skipped, "Consumer lagging, oldest events dropped");
                        self.lost += skipped;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
        }
    }

    /// Number of events this stream lost to the `DropOldest` policy.
    pub fn lost_events(&self) -> u64 {
        self.lost
    }
}

/// Create a connected sink and stream for the given policy.
pub(crate) fn event_channel(capacity: usize, policy: BackpressurePolicy) -> (EventSink, EventStream) {
    let (sink, inner) = match policy {
        BackpressurePolicy::BlockWithDeadline(deadline) => {
            let (tx, rx) = mpsc::channel(capacity);
            (EventSink::Bounded { tx, deadline }, StreamInner::Bounded(rx))
        }
        BackpressurePolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            (EventSink::Ring(tx), StreamInner::Ring(rx))
        }
    };

    (sink, EventStream { inner, lost: 0 })
}

/// Handle to a running register poller.
///
/// Dropping the listener stops the poller.
///
/// # Examples
///
/// ```
/// use turnstile_driver::{Device, PollerExit};
/// use turnstile_core::{Event, RegisterSnapshot};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> turnstile_core::Result<()> {
///     let (device, handle) = Device::mock();
///     handle.push_registers(RegisterSnapshot::default());
///     handle.push_registers(RegisterSnapshot { input_a: 1, ..Default::default() });
///
///     let mut listener = device.listen()?;
///     assert_eq!(listener.recv().await, Some(Event::InputA(1)));
///
///     assert_eq!(listener.shutdown().await, PollerExit::Shutdown);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Listener {
    events: EventStream,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollerExit>>,
}

impl Listener {
    pub(crate) fn new(
        events: EventStream,
        cancel: CancellationToken,
        task: JoinHandle<PollerExit>,
    ) -> Self {
        Self {
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Receive the next event. See [`EventStream::recv`].
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Access the underlying stream.
    pub fn events(&mut self) -> &mut EventStream {
        &mut self.events
    }

    /// Number of events lost to the `DropOldest` policy.
    pub fn lost_events(&self) -> u64 {
        self.events.lost_events()
    }

    /// Whether the poller task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Stop the poller and wait for it to finish.
    ///
    /// Returns why the poller stopped. A poller that had already escalated
    /// reports [`PollerExit::Escalated`].
    pub async fn shutdown(mut self) -> PollerExit {
        self.cancel.cancel();

        let Some(task) = self.task.take() else {
            return PollerExit::Shutdown;
        };

        match task.await {
            Ok(exit) => exit,
            Err(e) if e.is_cancelled() => PollerExit::Shutdown,
            Err(_) => PollerExit::Panicked,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_send_drops_after_deadline() {
        let policy = BackpressurePolicy::BlockWithDeadline(Duration::from_secs(3));
        let (sink, mut stream) = event_channel(1, policy);

        assert_eq!(sink.send(Event::InputA(1)).await, Delivery::Delivered);
        assert_eq!(sink.send(Event::InputA(2)).await, Delivery::Dropped);

        assert_eq!(stream.recv().await, Some(Event::InputA(1)));
        assert_eq!(sink.send(Event::InputA(3)).await, Delivery::Delivered);
        assert_eq!(stream.recv().await, Some(Event::InputA(3)));
    }

    #[tokio::test]
    async fn test_ring_keeps_newest() {
        let (sink, mut stream) = event_channel(2, BackpressurePolicy::DropOldest);

        for value in 1..=5 {
            assert_eq!(sink.send(Event::InputA(value)).await, Delivery::Delivered);
        }
        drop(sink);

        assert_eq!(stream.recv().await, Some(Event::InputA(4)));
        assert_eq!(stream.recv().await, Some(Event::InputA(5)));
        assert_eq!(stream.recv().await, None);
        assert_eq!(stream.lost_events(), 3);
    }

    #[tokio::test]
    async fn test_closed_when_stream_dropped() {
        for policy in [BackpressurePolicy::default(), BackpressurePolicy::DropOldest] {
            let (sink, stream) = event_channel(4, policy);
            assert!(!sink.is_closed());

            drop(stream);
            assert!(sink.is_closed());
            assert_eq!(sink.send(Event::Failure(1)).await, Delivery::Closed);
        }
    }
}
