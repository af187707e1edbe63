//! Register poller.
//!
//! One task per listener reads the register block on every tick, compares it
//! with the previous reading and emits an [`Event`] for each field that
//! changed. Its memory is a [`PollerState`], owned exclusively by that task.
//!
//! ```text
//! AwaitingTick ──► Reading ──► Validating ──► Diffing ──► Emitting ─┐
//!      ▲                           │                                │
//!      └───────────── failure ─────┴────────────────────────────────┘
//!                                  │
//!                     failures > threshold
//!                                  ▼
//!                               Closed
//! ```
//!
//! Counters `input_a` and `input_b` only produce events for small forward
//! steps (less than the pulse guard). Anything else, including a wrap or a
//! controller reset, is logged and folded into the new baseline silently.

use crate::config::PollerConfig;
use crate::device::{Device, Response};
use crate::events::{Delivery, EventSink, Listener, event_channel};
use bytes::Bytes;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use turnstile_core::{
    EscalationError, Event, EventKind, FramingError, ReadError, RegisterSnapshot, Result,
    constants::REGISTER_PAYLOAD_LEN,
};

/// Phase of the poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    AwaitingTick,
    Reading,
    Validating,
    Diffing,
    Emitting,
    Closed,
}

/// Result of processing one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The exchange failed; the tick is skipped.
    Failed { failures: u32, cause: ReadError },

    /// Too many consecutive failures; the poller must stop.
    Escalated(EscalationError),

    /// Response identical to the previous one.
    Unchanged,

    /// First valid snapshot, stored as the baseline.
    Seeded(RegisterSnapshot),

    /// New snapshot stored, nothing to report.
    Accepted(RegisterSnapshot),

    /// New snapshot stored, these events must be emitted in order.
    Changed(Vec<Event>),
}

/// Memory of the register poller.
#[derive(Debug, Clone)]
pub struct PollerState {
    baseline: Option<RegisterSnapshot>,
    last_raw: Option<Bytes>,
    consecutive_failures: u32,
    failure_threshold: u32,
    pulse_guard: u32,
    phase: PollPhase,
}

impl PollerState {
    pub fn new(failure_threshold: u32, pulse_guard: u32) -> Self {
        Self {
            baseline: None,
            last_raw: None,
            consecutive_failures: 0,
            failure_threshold,
            pulse_guard,
            phase: PollPhase::AwaitingTick,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn baseline(&self) -> Option<&RegisterSnapshot> {
        self.baseline.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Mark the start of an exchange.
    pub fn begin_read(&mut self) {
        self.phase = PollPhase::Reading;
    }

    /// Mark the end of emission for the current tick.
    pub fn finish_tick(&mut self) {
        if self.phase != PollPhase::Closed {
            self.phase = PollPhase::AwaitingTick;
        }
    }

    /// Classify the outcome of one exchange and update the poller memory.
    pub fn process(&mut self, result: std::result::Result<Response, ReadError>) -> TickOutcome {
        self.phase = PollPhase::Validating;

        let response = match result {
            Ok(response) => response,
            Err(cause) => return self.fail(cause),
        };

        let payload_len = response.payload().len();
        if payload_len < REGISTER_PAYLOAD_LEN {
            return self.fail(
                FramingError::PayloadTooShort {
                    expected: REGISTER_PAYLOAD_LEN,
                    actual: payload_len,
                }
                .into(),
            );
        }

        self.consecutive_failures = 0;

        if self.last_raw.as_ref() == Some(response.as_bytes()) {
            self.phase = PollPhase::AwaitingTick;
            return TickOutcome::Unchanged;
        }

        let snapshot = match response.decode() {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(e.into()),
        };
        self.last_raw = Some(response.as_bytes().clone());
        self.apply(snapshot)
    }

    /// Seed the baseline or diff against it, then replace it.
    pub fn apply(&mut self, snapshot: RegisterSnapshot) -> TickOutcome {
        self.phase = PollPhase::Diffing;

        let Some(previous) = self.baseline.replace(snapshot) else {
            debug!(?snapshot, "Baseline seeded");
            self.phase = PollPhase::AwaitingTick;
            return TickOutcome::Seeded(snapshot);
        };

        let events = diff_snapshots(&previous, &snapshot, self.pulse_guard);
        if events.is_empty() {
            self.phase = PollPhase::AwaitingTick;
            TickOutcome::Accepted(snapshot)
        } else {
            self.phase = PollPhase::Emitting;
            TickOutcome::Changed(events)
        }
    }

    fn fail(&mut self, cause: ReadError) -> TickOutcome {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let failures = self.consecutive_failures;

        if failures > self.failure_threshold {
            self.phase = PollPhase::Closed;
            return TickOutcome::Escalated(EscalationError { failures, cause });
        }

        if cause.is_transient() {
            debug!(failures, %cause, "Transient read failure, tick skipped");
        } else {
            warn!(failures, %cause, "Read failed, tick skipped");
        }

        self.phase = PollPhase::AwaitingTick;
        TickOutcome::Failed { failures, cause }
    }
}

/// Compute the events between two snapshots.
///
/// Emission order is fixed: InputA, InputB, Failure, Battery, Alarm.
///
/// # Examples
///
/// ```
/// use turnstile_driver::diff_snapshots;
/// use turnstile_core::{Event, RegisterSnapshot};
///
/// let previous = RegisterSnapshot { input_a: 10, input_b: 5, ..Default::default() };
/// let current = RegisterSnapshot { input_a: 12, input_b: 5, ..Default::default() };
///
/// assert_eq!(diff_snapshots(&previous, &current, 30), vec![Event::InputA(12)]);
/// ```
pub fn diff_snapshots(
    previous: &RegisterSnapshot,
    current: &RegisterSnapshot,
    pulse_guard: u32,
) -> Vec<Event> {
    let mut events = Vec::new();

    if is_pulse(previous.input_a, current.input_a, pulse_guard, EventKind::InputA) {
        events.push(Event::InputA(current.input_a));
    }
    if is_pulse(previous.input_b, current.input_b, pulse_guard, EventKind::InputB) {
        events.push(Event::InputB(current.input_b));
    }
    if previous.failure != current.failure {
        events.push(Event::Failure(current.failure));
    }
    if previous.battery_flag != current.battery_flag {
        events.push(Event::Battery(current.battery_flag));
    }
    if previous.alarm != current.alarm {
        events.push(Event::Alarm(current.alarm));
    }

    events
}

fn is_pulse(previous: u32, current: u32, pulse_guard: u32, counter: EventKind) -> bool {
    if current > previous && current - previous < pulse_guard {
        return true;
    }
    if current != previous {
        warn!(
            %counter,
            previous,
            current,
            pulse_guard,
            "Counter jump outside pulse guard, not reported"
        );
    }
    false
}

/// Why a poller task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// Stopped on request.
    Shutdown,

    /// Stopped after too many consecutive failures.
    Escalated,

    /// The consumer dropped the event stream.
    ConsumerGone,

    /// The task panicked.
    Panicked,
}

/// Register poller bound to one device.
#[derive(Debug)]
pub struct Poller {
    device: Device,
    config: PollerConfig,
    state: PollerState,
}

impl Poller {
    /// Create a poller.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(device: Device, config: PollerConfig) -> Result<Self> {
        config.validate()?;
        let state = PollerState::new(config.failure_threshold, config.pulse_guard);

        Ok(Self {
            device,
            config,
            state,
        })
    }

    /// Spawn the poll loop on the current Tokio runtime.
    pub fn spawn(self) -> Listener {
        let (sink, events) = event_channel(self.config.channel_capacity, self.config.backpressure);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(sink, cancel.clone()));

        Listener::new(events, cancel, task)
    }

    async fn run(mut self, sink: EventSink, cancel: CancellationToken) -> PollerExit {
        let period = self.config.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            device = %self.device.name(),
            interval_ms = period.as_millis() as u64,
            backpressure = ?self.config.backpressure,
            "Register poller started"
        );

        let exit = 'poll: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'poll PollerExit::Shutdown,
                _ = ticker.tick() => {}
            }

            if sink.is_closed() {
                break 'poll PollerExit::ConsumerGone;
            }

            self.state.begin_read();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'poll PollerExit::Shutdown,
                result = self.device.read_response() => result,
            };

            match self.state.process(result) {
                TickOutcome::Changed(events) => {
                    for event in events {
                        if sink.send(event).await == Delivery::Closed {
                            break 'poll PollerExit::ConsumerGone;
                        }
                    }
                    self.state.finish_tick();
                }
                TickOutcome::Escalated(escalation) => {
                    error!(
                        device = %self.device.name(),
                        failures = escalation.failures,
                        cause = %escalation.cause,
                        "Device unreachable, closing event stream"
                    );
                    sink.send(Event::Error(escalation)).await;
                    break 'poll PollerExit::Escalated;
                }
                TickOutcome::Seeded(_) | TickOutcome::Accepted(_) | TickOutcome::Unchanged => {
                    debug!(device = %self.device.name(), "Tick complete, nothing to emit");
                }
                TickOutcome::Failed { .. } => {}
            }
        };

        info!(device = %self.device.name(), ?exit, "Register poller stopped");
        exit
    }
}
