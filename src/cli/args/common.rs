//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - human-optimized rich formatting
    #[default]
    Pretty,
    /// Table format - one row per reading
    Table,
    /// JSON format - structured for scripts
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    /// Parse a format name from the config file
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}
