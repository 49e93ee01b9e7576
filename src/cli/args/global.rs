//! Global CLI options shared across all commands

use std::path::{Path, PathBuf};

use crate::cache::ReadMode;
use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// For most options, the precedence is: CLI flag > environment variable > config file > default.
/// This struct captures the CLI/env layer; config file defaults are resolved later in
/// `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format, if given on the command line or in the environment
    pub format: Option<OutputFormat>,

    /// Custom config file path (defaults to ~/.devctl/config.yaml)
    pub config: Option<PathBuf>,

    /// Cache root override
    pub cache_dir: Option<PathBuf>,

    /// Serve only cached data
    pub offline: bool,

    /// Ignore cached freshness and always fetch
    pub refresh: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            cache_dir: cli.cache_dir.clone(),
            offline: cli.offline,
            refresh: cli.refresh,
        }
    }

    pub fn read_mode(&self) -> ReadMode {
        ReadMode::from_flags(self.offline, self.refresh)
    }

    pub fn config_ref(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn cache_dir_ref(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mode_from_flags() {
        let mut opts = GlobalOptions::default();
        assert_eq!(opts.read_mode(), ReadMode::Normal);

        opts.refresh = true;
        assert_eq!(opts.read_mode(), ReadMode::ForceRefresh);

        opts.refresh = false;
        opts.offline = true;
        assert_eq!(opts.read_mode(), ReadMode::OfflineOnly);
    }

    #[test]
    fn test_global_options_accessors() {
        let opts = GlobalOptions {
            config: Some(PathBuf::from("/custom/config.yaml")),
            cache_dir: Some(PathBuf::from("/tmp/devctl")),
            ..Default::default()
        };

        assert_eq!(opts.config_ref(), Some(Path::new("/custom/config.yaml")));
        assert_eq!(opts.cache_dir_ref(), Some(Path::new("/tmp/devctl")));
    }
}
