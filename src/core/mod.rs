// Core modules
pub mod constants;
pub mod types;

pub use types::{now_millis, Aggregate, MetricDefinition, Sample, Window};
