/// Default interval between poll ticks (milliseconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Minimum tick interval (milliseconds)
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Maximum tick interval (milliseconds)
pub const MAX_TICK_INTERVAL_MS: u64 = 3_600_000;

/// Consecutive failed fetches before a metric is reported as degraded
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Timeout for a single bridge round trip (milliseconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// MBean serving the windowed request counters
pub const DEFAULT_MBEAN: &str = "mapcode:name=SystemMetrics";

/// MBean serving the JVM memory figures
pub const MEMORY_MBEAN: &str = "java.lang:type=Memory";

/// Attribute of [`MEMORY_MBEAN`] holding heap usage
pub const HEAP_MEMORY_ATTRIBUTE: &str = "HeapMemoryUsage";

/// Path inside [`HEAP_MEMORY_ATTRIBUTE`] to the bytes in use
pub const HEAP_MEMORY_USED_PATH: &str = "used";
