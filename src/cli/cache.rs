//! Cache management commands

use colored::Colorize;

use crate::cache::{ClearScope, DeviceId};
use crate::cli::context::{load_config, resolve_format};
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::error::Result;
use crate::models::{CacheEntryDisplay, KindCountDisplay};
use crate::output::formatters::{format_size, format_timestamp_local};
use crate::output::{json, table};

/// Show cache statistics, or the cached kinds of one device
pub fn show(ctx: &CommandContext, device: Option<&str>) -> Result<()> {
    match device {
        Some(name) => show_device(ctx, &cache_id(ctx, name)),
        None => show_stats(ctx),
    }
}

fn show_stats(ctx: &CommandContext) -> Result<()> {
    let admin = ctx.admin();
    let stats = admin.stats()?;
    let devices = admin.devices()?;
    let path = admin.root().display().to_string();

    match ctx.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "path": path,
                "total_entries": stats.total_entries,
                "expired_entries": stats.expired_entries,
                "device_count": stats.device_count,
                "devices": devices,
                "by_kind": stats.by_kind,
                "unreadable_units": stats.unreadable_units,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_entry": stats.oldest_entry,
                "newest_entry": stats.newest_entry,
            });
            println!("{}", json::format_json(&out)?);
        }
        _ => {
            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", path);
            println!("Devices:        {}", stats.device_count);
            println!("Entries:        {}", stats.total_entries);
            println!("Expired:        {}", stats.expired_entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));
            if stats.unreadable_units > 0 {
                println!(
                    "Unreadable:     {}",
                    stats.unreadable_units.to_string().yellow()
                );
            }
            if let Some(oldest) = stats.oldest_entry {
                println!("Oldest entry:   {}", format_timestamp_local(oldest));
            }
            if let Some(newest) = stats.newest_entry {
                println!("Newest entry:   {}", format_timestamp_local(newest));
            }

            if !stats.by_kind.is_empty() {
                let rows: Vec<KindCountDisplay> = stats
                    .by_kind
                    .iter()
                    .map(|(kind, entries)| KindCountDisplay {
                        kind: kind.clone(),
                        entries: *entries,
                    })
                    .collect();
                println!();
                println!("{}", table::format_table(&rows));
            }
            if !devices.is_empty() {
                let names: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
                println!("Cached devices: {}", names.join(", "));
            }
        }
    }

    Ok(())
}

fn show_device(ctx: &CommandContext, device: &DeviceId) -> Result<()> {
    let entries = ctx.admin().entries(device);

    match ctx.format {
        OutputFormat::Json => {
            let out = serde_json::json!({"device": device, "entries": entries});
            println!("{}", json::format_json(&out)?);
        }
        _ => {
            if entries.is_empty() {
                println!("Nothing cached for {}", device);
                return Ok(());
            }
            let rows: Vec<CacheEntryDisplay> = entries.iter().map(CacheEntryDisplay::from).collect();
            println!("{}", table::format_table(&rows));
        }
    }

    Ok(())
}

/// Clear cached data, optionally only for one device or only expired entries
pub fn clear(ctx: &CommandContext, device: Option<&str>, expired: bool) -> Result<()> {
    let scope = ClearScope::from_args(device.map(|name| cache_id(ctx, name)), expired);
    let report = ctx.admin().clear(&scope)?;

    match ctx.format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "entries_removed": report.entries_removed,
                "devices_removed": report.devices_removed,
                "success": true,
            });
            println!("{}", json::format_json(&out)?);
        }
        _ => {
            if report.entries_removed > 0 {
                println!("Cleared {} cache entries", report.entries_removed);
            } else {
                println!("Nothing to clear");
            }
        }
    }

    Ok(())
}

/// Print the cache directory without creating it
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let config = load_config(opts)?;
    let dir = config.cache_dir(opts.cache_dir_ref())?;

    match resolve_format(opts, &config) {
        OutputFormat::Json => {
            let out = serde_json::json!({"path": dir.display().to_string()});
            println!("{}", json::format_json(&out)?);
        }
        _ => println!("{}", dir.display()),
    }
    Ok(())
}

/// Cache id for a device argument. Names no longer in the config still map to
/// their old cache unit so it can be inspected or cleared.
fn cache_id(ctx: &CommandContext, name: &str) -> DeviceId {
    match ctx.config.resolve_device(name) {
        Ok(target) => target.id,
        Err(e) => {
            log::debug!("{}; using '{}' as the cache id", e, name);
            DeviceId::new(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> CommandContext {
        let opts = GlobalOptions {
            config: Some(dir.path().join("config.yaml")),
            cache_dir: Some(dir.path().join("cache")),
            ..Default::default()
        };
        CommandContext::new(&opts).unwrap()
    }

    #[test]
    fn test_cache_id_prefers_configured_name() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.config
            .add_device("kitchen", "192.168.1.20", None)
            .unwrap();

        assert_eq!(cache_id(&ctx, "kitchen"), DeviceId::new("kitchen"));
        assert_eq!(cache_id(&ctx, "192.168.1.20"), DeviceId::new("kitchen"));
        assert_eq!(cache_id(&ctx, "retired"), DeviceId::new("retired"));
    }

    #[test]
    fn test_clear_on_empty_cache() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        assert!(clear(&ctx, None, false).is_ok());
        assert!(clear(&ctx, Some("kitchen"), true).is_ok());
        assert!(show(&ctx, None).is_ok());
        assert!(show(&ctx, Some("kitchen")).is_ok());
    }
}
