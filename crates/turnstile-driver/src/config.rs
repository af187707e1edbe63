//! Device and poller configuration.

use std::time::Duration;
use turnstile_core::{
    Error, Result,
    constants::{
        DEFAULT_BAUD_RATE, DEFAULT_DEVICE_ADDRESS, DEFAULT_EVENT_CAPACITY,
        DEFAULT_FAILURE_THRESHOLD, DEFAULT_PORT_NAME, DEFAULT_PULSE_GUARD,
        DEFAULT_READ_TIMEOUT_SECS, DEFAULT_SEND_DEADLINE_MS, DEFAULT_TICK_INTERVAL_MS,
    },
};

/// Serial link configuration for one controller.
///
/// # Examples
///
/// ```
/// use turnstile_driver::DeviceConfig;
/// use std::time::Duration;
///
/// let config = DeviceConfig::new("/dev/ttyS1", 19200)
///     .with_read_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.address, 0x82);
/// assert_eq!(config.baud_rate, 19200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Serial port name or path.
    pub port_name: String,

    /// Link speed in baud.
    pub baud_rate: u32,

    /// Bus address of the controller.
    pub address: u8,

    /// Ceiling for a single transport read.
    pub read_timeout: Duration,
}

impl DeviceConfig {
    /// Create a configuration for the given port with default address and timeout.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Set the bus address.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_DEVICE_ADDRESS,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

/// What the poller does when the consumer is not draining events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait up to the given duration for room in the channel, then drop the
    /// event being sent.
    BlockWithDeadline(Duration),

    /// Never wait; when the channel is full the oldest queued event is lost.
    DropOldest,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self::BlockWithDeadline(Duration::from_millis(DEFAULT_SEND_DEADLINE_MS))
    }
}

/// Register poller configuration.
///
/// # Examples
///
/// ```
/// use turnstile_driver::{BackpressurePolicy, PollerConfig};
/// use std::time::Duration;
///
/// let config = PollerConfig::default()
///     .with_tick_interval(Duration::from_millis(250))
///     .with_backpressure(BackpressurePolicy::DropOldest);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.failure_threshold, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Interval between two register polls.
    pub tick_interval: Duration,

    /// Consecutive failed ticks tolerated; one more escalates.
    pub failure_threshold: u32,

    /// Exclusive upper bound for a counter delta reported as pulses.
    pub pulse_guard: u32,

    /// Capacity of the event channel.
    pub channel_capacity: usize,

    /// Behaviour when the channel is full.
    pub backpressure: BackpressurePolicy,
}

impl PollerConfig {
    /// Set the poll interval.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Set the number of tolerated consecutive failures.
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Set the pulse guard.
    pub fn with_pulse_guard(mut self, pulse_guard: u32) -> Self {
        self.pulse_guard = pulse_guard;
        self
    }

    /// Set the event channel capacity.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Set the backpressure policy.
    pub fn with_backpressure(mut self, backpressure: BackpressurePolicy) -> Self {
        self.backpressure = backpressure;
        self
    }

    /// Check the configuration for values the poller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero tick interval or a zero channel capacity.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::Config("tick interval must be non-zero".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "event channel capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            pulse_guard: DEFAULT_PULSE_GUARD,
            channel_capacity: DEFAULT_EVENT_CAPACITY,
            backpressure: BackpressurePolicy::default(),
        }
    }
}
