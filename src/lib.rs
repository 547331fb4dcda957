//! Horizon Poller - periodic polling of windowed JMX counters for dashboards
//!
//! This crate polls counters exposed through an HTTP-to-JMX bridge at a fixed interval and
//! delivers the readings to any number of renderers. Drawing the charts is left to the
//! renderers; the crate owns the cadence, failure tracking and fan-out.
//!
//! # Components
//!
//! - **[`source`]**: [`MetricSource`](source::MetricSource) reads one series and never fails;
//!   transport errors come back as samples without a value. [`JolokiaBridge`](source::JolokiaBridge)
//!   is the HTTP transport.
//! - **[`scheduler`]**: [`PollScheduler`](scheduler::PollScheduler) ticks on a fixed grid, keeps at
//!   most one fetch per series in flight and reports series that keep failing.
//! - **[`registry`]**: [`SeriesRegistry`](registry::SeriesRegistry) caches the latest sample per
//!   label and notifies subscribers.
//! - **[`config`]**: one flat [`MonitorConfig`](config::MonitorConfig) per dashboard.
//! - **[`dashboard`]**: wires all of the above from a config.
//!
//! # Examples
//!
//! ```no_run
//! use horizon_poller::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = MonitorConfig::new("http://localhost:8080/jolokia")
//!         .with_panel(Panel::new("All Requests", "AllMapcodeToLatLonRequests", Aggregate::Avg));
//!     let dashboard = Dashboard::from_config(config)?;
//!
//!     let (_handle, mut events) = dashboard.registry().subscribe_channel();
//!     dashboard.start()?;
//!     while let Some(event) = events.recv().await {
//!         if let RegistryEvent::Sample(sample) = event {
//!             println!("{} = {:?}", sample.label, sample.value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Only caller mistakes surface as errors: invalid configuration, duplicate labels, starting
//! outside a runtime. Nothing on the polling path stops the scheduler.
//!
//! ```rust
//! use horizon_poller::{Error, Result};
//! use horizon_poller::core::MetricDefinition;
//!
//! fn example() -> Result<()> {
//!     match MetricDefinition::new("Req", "", "L1") {
//!         Err(Error::InvalidDefinition(msg)) => println!("rejected: {}", msg),
//!         other => panic!("unexpected: {:?}", other),
//!     }
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
#![doc(html_root_url = "https://docs.rs/horizon-poller/0.1.0")]

pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod source;

pub use error::{Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::config::{MonitorConfig, Panel};
    pub use crate::core::{Aggregate, MetricDefinition, Sample, Window};
    pub use crate::dashboard::Dashboard;
    pub use crate::registry::{DegradedMetricWarning, RegistryEvent, SeriesRegistry, SubscriptionHandle};
    pub use crate::scheduler::{PollScheduler, PollState};
    pub use crate::source::{BridgeSource, BridgeTransport, JolokiaBridge, MetricSource};
    pub use crate::{Error, Result};
}
