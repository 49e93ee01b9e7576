//! Device command implementations

use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use futures::future::join_all;
use serde_json::json;
use tokio::time::MissedTickBehavior;

use crate::cache::{CacheStore, CachedDeviceClient, DeviceId, Kind};
use crate::cli::context::{config_path, load_config, resolve_format};
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::{DeviceApi, DeviceTarget, NetworkSection};
use crate::error::{Error, Result};
use crate::models::{DeviceDisplay, DeviceReading, ReadingRow, value_fields};
use crate::output::formatters::freshness_line;
use crate::output::{json, table};

/// Widest value shown in pretty and table field listings
const MAX_FIELD_WIDTH: usize = 100;

/// Run the device list command
pub fn list(opts: &GlobalOptions) -> Result<()> {
    let config = load_config(opts)?;
    let rows: Vec<DeviceDisplay> = config.devices.iter().map(DeviceDisplay::from).collect();

    match resolve_format(opts, &config) {
        OutputFormat::Json => println!("{}", json::format_json(&rows)?),
        OutputFormat::Table => println!("{}", table::format_table(&rows)),
        OutputFormat::Pretty => {
            if rows.is_empty() {
                println!("No devices configured. Add one with `devctl device add <name> <address>`.");
            }
            for row in &rows {
                let label = if row.label == "-" {
                    String::new()
                } else {
                    format!("  ({})", row.label)
                };
                println!("{}  {}{}", row.name.bold(), row.address, label.dimmed());
            }
        }
    }

    Ok(())
}

/// Run the device add command
pub fn add(opts: &GlobalOptions, name: &str, address: &str, label: Option<String>) -> Result<()> {
    let path = config_path(opts)?;
    let mut config = load_config(opts)?;
    config.add_device(name, address, label)?;
    config.save_to(&path)?;
    log::info!("Added device {} at {}", name, address);

    match resolve_format(opts, &config) {
        OutputFormat::Json => {
            let out = json!({"name": name, "address": address, "success": true});
            println!("{}", json::format_json(&out)?);
        }
        _ => println!("{} Added device {} ({})", "✓".green(), name.bold(), address),
    }
    Ok(())
}

/// Run the device remove command; the device's cached data goes with it
pub fn remove(opts: &GlobalOptions, name: &str) -> Result<()> {
    let path = config_path(opts)?;
    let mut config = load_config(opts)?;
    config.remove_device(name)?;
    config.save_to(&path)?;

    let cleared = config
        .cache_dir(opts.cache_dir_ref())
        .and_then(|dir| Ok(CacheStore::open_at(&dir, config.ttl_table())?))
        .and_then(|store| Ok(store.delete_device(&DeviceId::new(name))?))
        .unwrap_or_else(|e| {
            log::warn!("Could not clear cached data for {}: {}", name, e);
            0
        });

    match resolve_format(opts, &config) {
        OutputFormat::Json => {
            let out = json!({"name": name, "entries_removed": cleared, "success": true});
            println!("{}", json::format_json(&out)?);
        }
        _ => println!(
            "{} Removed device {} ({} cached entries cleared)",
            "✓".green(),
            name.bold(),
            cleared
        ),
    }
    Ok(())
}

/// Run `device info|status|config|firmware|automation|protocol` over one or
/// more devices, resolving them concurrently.
pub async fn show(ctx: &CommandContext, kind: Kind, names: &[String]) -> Result<()> {
    let targets = ctx.targets(names)?;
    let results = read_all(&ctx.client, &targets, &kind).await;

    let mut readings = Vec::new();
    let mut failures = Vec::new();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(reading) => readings.push(reading),
            Err(e) => failures.push((target.id.clone(), e)),
        }
    }

    if readings.is_empty()
        && failures.len() == 1
        && let Some((_, err)) = failures.pop()
    {
        return Err(err);
    }

    if !readings.is_empty() {
        println!("{}", render_readings(&readings, ctx.format)?);
    }
    for (device, err) in &failures {
        eprintln!("{} {}: {}", "✗".red(), device, err);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Other(format!(
            "{} of {} devices failed",
            failures.len(),
            targets.len()
        )))
    }
}

/// Run the device network command
pub async fn network(
    ctx: &CommandContext,
    name: &str,
    sections: &[NetworkSection],
) -> Result<()> {
    let target = ctx.config.resolve_device(name)?;
    let resolved = ctx.client.network_status(&target, sections).await?;
    let reading = DeviceReading::new(
        &target.id,
        Kind::NetworkStatus,
        &resolved,
        ctx.client.coordinator().now(),
    )?;

    println!("{}", render_readings(&[reading], ctx.format)?);
    Ok(())
}

/// Run the device watch command: refresh status and network detail on a
/// timer until `count` ticks have run or the user interrupts.
pub async fn watch(
    ctx: &CommandContext,
    name: &str,
    interval_secs: u64,
    count: Option<u64>,
) -> Result<()> {
    let target = ctx.config.resolve_device(name)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    loop {
        let (status, network) = tokio::select! {
            pair = async {
                ticker.tick().await;
                tokio::join!(
                    read(&ctx.client, &target, &Kind::Status),
                    read(&ctx.client, &target, &Kind::NetworkStatus),
                )
            } => pair,
            _ = tokio::signal::ctrl_c() => {
                log::debug!("Watch interrupted");
                break;
            }
        };

        println!("{}", render_watch_tick(&target.id, &status, &network, ctx.format)?);

        ticks += 1;
        if count.is_some_and(|c| ticks >= c) {
            break;
        }
    }

    Ok(())
}

/// Resolve one kind for one device into a display-ready reading
pub async fn read<C: DeviceApi + 'static>(
    client: &CachedDeviceClient<C>,
    target: &DeviceTarget,
    kind: &Kind,
) -> Result<DeviceReading> {
    let id = &target.id;
    let now = || client.coordinator().now();

    let reading = match kind {
        Kind::DeviceInfo => DeviceReading::new(id, kind.clone(), &client.device_info(target).await?, now()),
        Kind::Status => DeviceReading::new(id, kind.clone(), &client.status(target).await?, now()),
        Kind::NetworkStatus => DeviceReading::new(
            id,
            kind.clone(),
            &client.network_status(target, &[]).await?,
            now(),
        ),
        Kind::Config => DeviceReading::new(id, kind.clone(), &client.config(target).await?, now()),
        Kind::FirmwareState => DeviceReading::new(
            id,
            kind.clone(),
            &client.firmware_state(target).await?,
            now(),
        ),
        Kind::AutomationSettings => DeviceReading::new(
            id,
            kind.clone(),
            &client.automation_settings(target).await?,
            now(),
        ),
        Kind::ProtocolConfig => DeviceReading::new(
            id,
            kind.clone(),
            &client.protocol_config(target).await?,
            now(),
        ),
        Kind::Other(name) => {
            return Err(Error::Other(format!("don't know how to fetch '{}'", name)));
        }
    };

    Ok(reading?)
}

/// Resolve one kind for several devices concurrently, results in input order
pub async fn read_all<C: DeviceApi + 'static>(
    client: &CachedDeviceClient<C>,
    targets: &[DeviceTarget],
    kind: &Kind,
) -> Vec<Result<DeviceReading>> {
    join_all(targets.iter().map(|target| read(client, target, kind))).await
}

fn render_readings(readings: &[DeviceReading], format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Json => match readings {
            [single] => json::format_json_cached(&single.value, single.cache.clone())?,
            many => json::format_json(many)?,
        },
        OutputFormat::Table => match readings {
            [single] => format!(
                "{}\n{}",
                table::format_fields(&value_fields(&single.value, MAX_FIELD_WIDTH)),
                freshness_line(&single.cache)
            ),
            many => {
                let rows: Vec<ReadingRow> = many.iter().map(ReadingRow::from).collect();
                table::format_table(&rows)
            }
        },
        OutputFormat::Pretty => readings
            .iter()
            .map(render_pretty)
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    Ok(out)
}

fn render_pretty(reading: &DeviceReading) -> String {
    let mut lines = vec![format!(
        "{} {}",
        reading.device.to_string().bold(),
        reading.kind.to_string().dimmed()
    )];
    for (field, value) in value_fields(&reading.value, MAX_FIELD_WIDTH) {
        lines.push(format!("  {}: {}", field.cyan(), value));
    }
    lines.push(format!("  {}", freshness_line(&reading.cache).dimmed()));
    lines.join("\n")
}

fn render_watch_tick(
    device: &DeviceId,
    status: &Result<DeviceReading>,
    network: &Result<DeviceReading>,
    format: OutputFormat,
) -> Result<String> {
    let out = match format {
        OutputFormat::Json => {
            let part = |r: &Result<DeviceReading>| match r {
                Ok(reading) => json!({"summary": reading.summary, "value": reading.value, "cache": reading.cache}),
                Err(e) => json!({"error": e.to_string()}),
            };
            serde_json::to_string(&json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "device": device,
                "status": part(status),
                "network": part(network),
            }))?
        }
        _ => {
            let part = |label: &str, r: &Result<DeviceReading>| match r {
                Ok(reading) => format!(
                    "{}: {} ({})",
                    label,
                    reading.summary,
                    freshness_line(&reading.cache)
                ),
                Err(e) => format!("{}: {}", label, e.to_string().red()),
            };
            format!(
                "[{}] {}  {} | {}",
                Local::now().format("%H:%M:%S"),
                device.to_string().bold(),
                part("status", status),
                part("network", network)
            )
        }
    };
    Ok(out)
}
