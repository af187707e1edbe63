use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::time::Duration;
use tracing::{info, warn};
use turnstile_core::constants::DEFAULT_TICK_INTERVAL_MS;
use turnstile_driver::{BackpressurePolicy, Device, DeviceConfig, PollerConfig, PollerExit};

pub const SUCCESS: u8 = 0;
pub const FAILURE: u8 = 1;
pub const ESCALATED: u8 = 2;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the register block once and print `[input_a, input_b, failure, battery, alarm]`.
    Registers,

    /// Stream register change events until Ctrl-C or the device stops answering.
    Listen(ListenArgs),
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Poll interval in milliseconds.
    #[arg(long, env = "TURNSTILE_INTERVAL_MS", default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Drop the oldest queued events instead of waiting for a slow consumer.
    #[arg(long, env = "TURNSTILE_DROP_OLDEST")]
    pub drop_oldest: bool,
}

impl ListenArgs {
    fn poller_config(&self) -> PollerConfig {
        let config =
            PollerConfig::default().with_tick_interval(Duration::from_millis(self.interval_ms));

        if self.drop_oldest {
            config.with_backpressure(BackpressurePolicy::DropOldest)
        } else {
            config
        }
    }
}

pub async fn run(device_config: DeviceConfig, command: Command, format: OutputFormat) -> Result<u8> {
    let device = Device::open_with(&device_config)
        .with_context(|| format!("failed to open {}", device_config.port_name))?;

    match command {
        Command::Registers => registers(&device, format).await,
        Command::Listen(args) => listen(&device, &args, format).await,
    }
}

async fn registers(device: &Device, format: OutputFormat) -> Result<u8> {
    let registers = device
        .registers()
        .await
        .context("register read failed")?;

    output::print_registers(&registers, format);
    Ok(SUCCESS)
}

async fn listen(device: &Device, args: &ListenArgs, format: OutputFormat) -> Result<u8> {
    let mut listener = device
        .listen_with(args.poller_config())
        .context("failed to start poller")?;

    info!(
        port = %device.name(),
        interval_ms = args.interval_ms,
        drop_oldest = args.drop_oldest,
        "Listening for register events"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping poller");
                break;
            }
            event = listener.recv() => match event {
                Some(event) => output::print_event(&event, format),
                None => break,
            },
        }
    }

    let lost = listener.lost_events();
    if lost > 0 {
        warn!(lost, "Events lost to the drop-oldest policy");
    }

    Ok(exit_code(listener.shutdown().await))
}

fn exit_code(exit: PollerExit) -> u8 {
    match exit {
        PollerExit::Escalated => ESCALATED,
        PollerExit::Panicked => FAILURE,
        PollerExit::Shutdown | PollerExit::ConsumerGone => SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_args_to_config() {
        let args = ListenArgs {
            interval_ms: 250,
            drop_oldest: true,
        };
        let config = args.poller_config();

        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.backpressure, BackpressurePolicy::DropOldest);
        assert_eq!(config.failure_threshold, 3);
    }

    #[test]
    fn default_backpressure_blocks() {
        let args = ListenArgs {
            interval_ms: DEFAULT_TICK_INTERVAL_MS,
            drop_oldest: false,
        };
        assert_eq!(args.poller_config().backpressure, BackpressurePolicy::default());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(PollerExit::Shutdown), SUCCESS);
        assert_eq!(exit_code(PollerExit::ConsumerGone), SUCCESS);
        assert_eq!(exit_code(PollerExit::Escalated), ESCALATED);
        assert_eq!(exit_code(PollerExit::Panicked), FAILURE);
    }
}
