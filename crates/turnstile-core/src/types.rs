use crate::error::EscalationError;
use serde::Serialize;
use std::fmt;

/// One decoded register read.
///
/// The counters are monotonic by device design; the two flags are raw
/// bytes reduced to `byte > 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct RegisterSnapshot {
    /// Pulse counter of input A.
    pub input_a: u32,

    /// Pulse counter of input B.
    pub input_b: u32,

    /// Failure counter.
    pub failure: u32,

    /// Alarm flag.
    pub alarm: bool,

    /// Battery flag.
    ///
    /// The device does not document whether a set bit means "battery present"
    /// or "battery fault"; the value is passed through uninterpreted.
    pub battery_flag: bool,
}

impl RegisterSnapshot {
    /// Flatten into the point-read register vector.
    #[must_use]
    pub fn to_vector(&self) -> RegisterVector {
        RegisterVector([
            self.input_a,
            self.input_b,
            self.failure,
            u32::from(self.battery_flag),
            u32::from(self.alarm),
        ])
    }
}

/// Register vector returned by a point read.
///
/// Layout: `[input_a, input_b, failure, battery01, alarm01]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegisterVector(pub [u32; 5]);

impl RegisterVector {
    #[must_use]
    pub fn input_a(&self) -> u32 {
        self.0[0]
    }

    #[must_use]
    pub fn input_b(&self) -> u32 {
        self.0[1]
    }

    #[must_use]
    pub fn failure(&self) -> u32 {
        self.0[2]
    }

    #[must_use]
    pub fn battery_flag(&self) -> u32 {
        self.0[3]
    }

    #[must_use]
    pub fn alarm(&self) -> u32 {
        self.0[4]
    }

    /// Get the raw values.
    #[must_use]
    pub fn as_array(&self) -> &[u32; 5] {
        &self.0
    }
}

impl From<RegisterSnapshot> for RegisterVector {
    fn from(snapshot: RegisterSnapshot) -> Self {
        snapshot.to_vector()
    }
}

impl fmt::Display for RegisterVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, failure, battery, alarm] = self.0;
        write!(f, "[{a}, {b}, {failure}, {battery}, {alarm}]")
    }
}

/// Change notification emitted by the register poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum Event {
    /// Input A counter advanced to the carried value.
    InputA(u32),

    /// Input B counter advanced to the carried value.
    InputB(u32),

    /// Failure counter changed.
    Failure(u32),

    /// Alarm flag changed.
    Alarm(bool),

    /// Battery flag changed (raw polarity).
    Battery(bool),

    /// The device stopped answering; this is the last event of the stream.
    Error(EscalationError),
}

impl Event {
    /// Get the discriminant of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::InputA(_) => EventKind::InputA,
            Self::InputB(_) => EventKind::InputB,
            Self::Failure(_) => EventKind::Failure,
            Self::Alarm(_) => EventKind::Alarm,
            Self::Battery(_) => EventKind::Battery,
            Self::Error(_) => EventKind::Error,
        }
    }

    /// Whether this event terminates the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Event discriminant, used in logs and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InputA,
    InputB,
    Failure,
    Alarm,
    Battery,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EventKind::InputA => "input_a",
            EventKind::InputB => "input_b",
            EventKind::Failure => "failure",
            EventKind::Alarm => "alarm",
            EventKind::Battery => "battery",
            EventKind::Error => "error",
        };
        write!(f, "{}", name)
    }
}
