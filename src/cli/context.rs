//! Command execution context
//!
//! One place that turns global options into a loaded config, an open cache
//! store and a cached device client, so handlers don't repeat the wiring.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheAdmin, CacheStore, CachedDeviceClient, FetchCoordinator};
use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::{DeviceTarget, HttpDeviceClient};
use crate::config::Config;
use crate::error::Result;

/// Context for command execution containing config, cache and client.
///
/// Each process builds one store and threads it through every read; there is
/// no global cache handle.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
    pub store: Arc<CacheStore>,
    pub client: CachedDeviceClient<HttpDeviceClient>,
}

impl CommandContext {
    /// Load config, open the cache and build the device client.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = load_config(opts)?;
        let format = resolve_format(opts, &config);
        let mode = opts.read_mode();

        let cache_dir = config.cache_dir(opts.cache_dir_ref())?;
        log::debug!("Using cache at {}", cache_dir.display());
        let store = Arc::new(CacheStore::open_at(&cache_dir, config.ttl_table())?);

        let coordinator = Arc::new(FetchCoordinator::new(store.clone()));
        let device_client = Arc::new(HttpDeviceClient::new(config.timeout())?);
        let client = CachedDeviceClient::new(device_client, coordinator, mode);

        Ok(Self {
            config,
            format,
            store,
            client,
        })
    }

    pub fn admin(&self) -> CacheAdmin {
        CacheAdmin::new(self.store.clone())
    }

    /// Resolve every name or address, failing on the first unknown one
    pub fn targets(&self, names: &[String]) -> Result<Vec<DeviceTarget>> {
        names
            .iter()
            .map(|name| self.config.resolve_device(name))
            .collect()
    }
}

/// Config file path from options, or the default location
pub fn config_path(opts: &GlobalOptions) -> Result<PathBuf> {
    match opts.config_ref() {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path(),
    }
}

/// Load config, treating a missing file as empty
pub fn load_config(opts: &GlobalOptions) -> Result<Config> {
    Config::load_or_default(&config_path(opts)?)
}

/// Output format: flag/env, then config preference, then pretty
pub fn resolve_format(opts: &GlobalOptions, config: &Config) -> OutputFormat {
    if let Some(format) = opts.format {
        return format;
    }
    match config.preferences.format.as_deref().map(str::parse::<OutputFormat>) {
        Some(Ok(format)) => format,
        Some(Err(e)) => {
            log::warn!("Ignoring configured format: {}", e);
            OutputFormat::default()
        }
        None => OutputFormat::default(),
    }
}
