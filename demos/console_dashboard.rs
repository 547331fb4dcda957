use std::error::Error;

use horizon_poller::prelude::*;
use tracing_subscriber::EnvFilter;

/// Layout of the production request dashboard
fn default_config() -> MonitorConfig {
    MonitorConfig::new("http://localhost:8080/jolokia")
        .with_tick_interval_ms(1000)
        .with_panel(Panel::new("All Mapcode --> Lat/Lon Requests", "AllMapcodeToLatLonRequests", Aggregate::Avg))
        .with_panel(Panel::new("Valid Mapcode --> Lat/Lon Requests", "ValidMapcodeToLatLonRequests", Aggregate::Avg))
        .with_panel(Panel::new("All Lat/Lon --> Mapcode Requests", "AllLatLonToMapcodeRequests", Aggregate::Avg))
        .with_panel(Panel::new("Valid Lat/Lon --> Mapcode Requests", "ValidLatLonToMapcodeRequests", Aggregate::Avg))
        .with_panel(Panel::new("Warnings and Errors", "WarningsAndErrors", Aggregate::Sum))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::from_path(path)?,
        None => default_config(),
    };

    println!("Horizon Poller Console Dashboard");
    println!("================================");
    println!("Endpoint: {}", config.endpoint_url);

    let dashboard = Dashboard::from_config(config)?;

    match dashboard.heap_memory_used().await {
        Ok(bytes) => println!("Heap memory used: {:.1} MB", bytes / 1_048_576.0),
        Err(e) => println!("Heap memory used: unavailable ({})", e),
    }

    let (_handle, mut events) = dashboard.registry().subscribe_channel();
    dashboard.start()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(RegistryEvent::Snapshot(state)) => println!("{} series cached", state.len()),
                Some(RegistryEvent::Sample(sample)) => match sample.value {
                    Some(value) => println!("{:<50} {:>12.2}", sample.label, value),
                    None => println!("{:<50} {:>12}", sample.label, "-"),
                },
                Some(RegistryEvent::Degraded(warning)) => println!(
                    "\n🟠 {} DEGRADED after {} failures: {}",
                    warning.label,
                    warning.consecutive_failures,
                    warning.last_error.unwrap_or_default()
                ),
                Some(RegistryEvent::Recovered { label }) => println!("\n🟢 {} RECOVERED", label),
                None => break,
            },
        }
    }

    dashboard.stop();
    let state = dashboard.scheduler().poll_state();
    println!("\nStopped after {} ticks", state.tick_count);
    for (label, series) in &state.series {
        if series.skipped_ticks > 0 {
            println!("{:<50} skipped {} ticks", label, series.skipped_ticks);
        }
    }
    Ok(())
}
