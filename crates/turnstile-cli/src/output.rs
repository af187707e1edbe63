use chrono::{DateTime, Utc};
use serde::Serialize;
use turnstile_core::{Event, RegisterVector};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RegistersOutput<'a> {
    timestamp: DateTime<Utc>,
    registers: &'a RegisterVector,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a Event,
}

pub fn print_registers(registers: &RegisterVector, format: OutputFormat) {
    println!("{}", format_registers(registers, Utc::now(), format));
}

pub fn print_event(event: &Event, format: OutputFormat) {
    println!("{}", format_event(event, Utc::now(), format));
}

fn format_registers(
    registers: &RegisterVector,
    timestamp: DateTime<Utc>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => registers.to_string(),
        OutputFormat::Json => to_json(&RegistersOutput {
            timestamp,
            registers,
        }),
    }
}

fn format_event(event: &Event, timestamp: DateTime<Utc>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let value = match event {
                Event::InputA(n) | Event::InputB(n) | Event::Failure(n) => n.to_string(),
                Event::Alarm(flag) | Event::Battery(flag) => u8::from(*flag).to_string(),
                Event::Error(escalation) => escalation.to_string(),
            };
            format!("{} {} {}", timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"), event.kind(), value)
        }
        OutputFormat::Json => to_json(&EventOutput { timestamp, event }),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
