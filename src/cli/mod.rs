//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

use crate::client::NetworkSection;

pub mod args;
pub mod cache;
pub mod context;
pub mod device;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// devctl - command-line companion for networked smart-home devices
#[derive(Parser, Debug)]
#[command(name = "devctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "DEVCTL_FORMAT",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: Option<OutputFormat>,

    /// Override config file location
    #[arg(long, global = true, env = "DEVCTL_CONFIG", hide_env = true)]
    pub config: Option<PathBuf>,

    /// Override cache directory
    #[arg(long, global = true, env = "DEVCTL_CACHE_DIR", hide_env = true)]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "DEVCTL_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Serve cached data only, never contact devices
    #[arg(long, global = true, env = "DEVCTL_OFFLINE", hide_env = true)]
    pub offline: bool,

    /// Ignore cached data, always fetch from devices
    #[arg(
        long,
        global = true,
        env = "DEVCTL_REFRESH",
        hide_env = true,
        conflicts_with = "offline"
    )]
    pub refresh: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage and query devices
    #[command(subcommand)]
    Device(DeviceCommands),

    /// Manage local device data cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   devctl completion bash > /etc/bash_completion.d/devctl
  zsh:    devctl completion zsh > \"${fpath[1]}/_devctl\"
  fish:   devctl completion fish > ~/.config/fish/completions/devctl.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Device subcommands
#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    /// List configured devices
    List,

    /// Add a named device
    Add {
        /// Name to refer to the device by
        name: String,

        /// Host, host:port or URL of the device
        address: String,

        /// Display label
        #[arg(long)]
        label: Option<String>,
    },

    /// Remove a named device and its cached data
    Remove {
        /// Device name
        name: String,
    },

    /// Show device identity and firmware version
    Info {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show live component status
    Status {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show component configuration
    Config {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show available firmware updates
    Firmware {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show scripts and schedules
    Automation {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show MQTT and websocket settings
    Protocol {
        /// Device names or addresses
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Show network detail, fetching only the requested sections
    Network {
        /// Device name or address
        device: String,

        /// Sections to show (default: all)
        #[arg(long = "section", short = 's', value_enum, value_delimiter = ',')]
        sections: Vec<NetworkSection>,
    },

    /// Keep refreshing status and network detail on a timer
    Watch {
        /// Device name or address
        device: String,

        /// Seconds between refreshes
        #[arg(long, short = 'i', default_value = "5")]
        interval: u64,

        /// Stop after this many refreshes
        #[arg(long, short = 'n')]
        count: Option<u64>,
    },
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics, or one device's cached kinds
    Show {
        /// Device name or address
        #[arg(long)]
        device: Option<String>,
    },

    /// Clear cached data
    Clear {
        /// Only this device
        #[arg(long)]
        device: Option<String>,

        /// Only entries older than their TTL
        #[arg(long)]
        expired: bool,
    },

    /// Print the cache directory
    Path,
}
