mod commands;
mod logging;
mod output;

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use turnstile_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_PORT_NAME, DEFAULT_READ_TIMEOUT_SECS};
use turnstile_driver::DeviceConfig;

use crate::commands::Command;
use crate::logging::{LogLevel, init_logging};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "turnstile", version, about = "Turnstile controller serial driver")]
struct Cli {
    /// Serial port of the controller.
    #[arg(long, env = "TURNSTILE_PORT", default_value = DEFAULT_PORT_NAME, global = true)]
    port: String,

    /// Link speed in baud.
    #[arg(long, env = "TURNSTILE_BAUD", default_value_t = DEFAULT_BAUD_RATE, global = true)]
    baud: u32,

    /// Bus address of the controller, decimal or 0x-prefixed hex.
    #[arg(
        long,
        env = "TURNSTILE_ADDRESS",
        default_value = "0x82",
        value_parser = parse_address,
        global = true
    )]
    address: u8,

    /// Read timeout in seconds.
    #[arg(
        long,
        env = "TURNSTILE_READ_TIMEOUT_SECS",
        default_value_t = DEFAULT_READ_TIMEOUT_SECS,
        global = true
    )]
    read_timeout_secs: u64,

    /// Minimum log level (stderr). `RUST_LOG` takes precedence when set.
    #[arg(long, env = "TURNSTILE_LOG_LEVEL", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Print JSON lines instead of text.
    #[arg(long, env = "TURNSTILE_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn device_config(&self) -> DeviceConfig {
        DeviceConfig::new(&self.port, self.baud)
            .with_address(self.address)
            .with_read_timeout(Duration::from_secs(self.read_timeout_secs))
    }
}

fn parse_address(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid address {value:?}: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let device_config = cli.device_config();

    match commands::run(device_config, cli.command, format).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(commands::FAILURE)
        }
    }
}
