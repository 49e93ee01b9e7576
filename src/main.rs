//! devctl - command-line companion for networked smart-home devices

use std::io;

use clap::{CommandFactory, Parser};

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;

use cache::Kind;
use cli::{CacheCommands, Cli, CommandContext, Commands, DeviceCommands, GlobalOptions};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Version => {
            println!("devctl version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "devctl", &mut io::stdout());
            Ok(())
        }
        Commands::Device(device_cmd) => match device_cmd {
            DeviceCommands::List => cli::device::list(&opts),
            DeviceCommands::Add {
                name,
                address,
                label,
            } => cli::device::add(&opts, &name, &address, label),
            DeviceCommands::Remove { name } => cli::device::remove(&opts, &name),
            DeviceCommands::Info { devices } => show(&opts, Kind::DeviceInfo, &devices).await,
            DeviceCommands::Status { devices } => show(&opts, Kind::Status, &devices).await,
            DeviceCommands::Config { devices } => show(&opts, Kind::Config, &devices).await,
            DeviceCommands::Firmware { devices } => {
                show(&opts, Kind::FirmwareState, &devices).await
            }
            DeviceCommands::Automation { devices } => {
                show(&opts, Kind::AutomationSettings, &devices).await
            }
            DeviceCommands::Protocol { devices } => {
                show(&opts, Kind::ProtocolConfig, &devices).await
            }
            DeviceCommands::Network { device, sections } => {
                let ctx = CommandContext::new(&opts)?;
                cli::device::network(&ctx, &device, &sections).await
            }
            DeviceCommands::Watch {
                device,
                interval,
                count,
            } => {
                let ctx = CommandContext::new(&opts)?;
                cli::device::watch(&ctx, &device, interval, count).await
            }
        },
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Show { device } => {
                let ctx = CommandContext::new(&opts)?;
                cli::cache::show(&ctx, device.as_deref())
            }
            CacheCommands::Clear { device, expired } => {
                let ctx = CommandContext::new(&opts)?;
                cli::cache::clear(&ctx, device.as_deref(), expired)
            }
            CacheCommands::Path => cli::cache::path(&opts),
        },
    }
}

async fn show(opts: &GlobalOptions, kind: Kind, devices: &[String]) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    cli::device::show(&ctx, kind, devices).await
}

/// Warnings by default; `--debug` turns on debug output for this crate.
/// `RUST_LOG` still takes precedence when set.
fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Warn);
    if debug {
        builder.filter_module("devctl", log::LevelFilter::Debug);
    }
    builder.parse_default_env();
    builder.format_timestamp(None);
    builder.init();
}
