use std::sync::Arc;

use tracing::info;

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::registry::SeriesRegistry;
use crate::scheduler::PollScheduler;
use crate::source::{BridgeSource, JolokiaBridge};

/// Everything one dashboard page needs: a bridge, a registry and a scheduler wired together.
///
/// ```no_run
/// use horizon_poller::config::{MonitorConfig, Panel};
/// use horizon_poller::core::Aggregate;
/// use horizon_poller::dashboard::Dashboard;
///
/// #[tokio::main]
/// async fn main() -> horizon_poller::Result<()> {
///     let config = MonitorConfig::new("http://localhost:8080/jolokia")
///         .with_panel(Panel::new("Warnings and Errors", "WarningsAndErrors", Aggregate::Sum));
///     let dashboard = Dashboard::from_config(config)?;
///
///     println!("heap used: {}", dashboard.heap_memory_used().await?);
///     let _handle = dashboard.registry().subscribe(|event| println!("{:?}", event));
///     dashboard.start()?;
///     tokio::signal::ctrl_c().await?;
///     dashboard.stop();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Dashboard {
    config: MonitorConfig,
    bridge: Arc<JolokiaBridge>,
    registry: Arc<SeriesRegistry>,
    scheduler: PollScheduler,
}

impl Dashboard {
    pub fn from_config(config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let bridge = Arc::new(JolokiaBridge::from_config(&config)?);
        let registry = Arc::new(SeriesRegistry::new());
        let scheduler = PollScheduler::from_config(
            &config,
            Arc::new(BridgeSource::new(Arc::clone(&bridge))),
            Arc::clone(&registry),
        )?;

        info!(
            endpoint = %config.endpoint_url,
            mbean = %config.mbean,
            series = scheduler.definitions().len(),
            "dashboard configured"
        );
        Ok(Self { config, bridge, registry, scheduler })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SeriesRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn bridge(&self) -> &Arc<JolokiaBridge> {
        &self.bridge
    }

    pub fn start(&self) -> Result<()> {
        self.scheduler.start()
    }

    pub fn stop(&self) {
        self.scheduler.stop()
    }

    /// One-off read of the JVM heap bytes in use.
    pub async fn heap_memory_used(&self) -> Result<f64> {
        self.bridge.heap_memory_used().await
    }
}
