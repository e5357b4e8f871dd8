use std::num::NonZeroU32;
use std::time::Duration;

/// Number of simulated users when none is configured.
pub const DEFAULT_USERS: NonZeroU32 = NonZeroU32::MIN;

/// Users spawned per second when no spawn rate is configured.
pub const DEFAULT_SPAWN_RATE: NonZeroU32 = NonZeroU32::MIN;

/// Scenario iterations per second, per user (constant throughput pacing).
pub const DEFAULT_THROUGHPUT: f64 = 1.0;

/// Granularity of the engine's control loop (user ramp-up, shutdown checks).
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How often interim measurements are collected and logged.
pub const STATS_INTERVAL: Duration = Duration::from_secs(2);

/// Percentiles printed in the end-of-run summary.
pub const REPORTED_PERCENTILES: [f64; 11] = [
    0.50, 0.66, 0.75, 0.80, 0.90, 0.95, 0.98, 0.99, 0.999, 0.9999, 1.0,
];

pub(crate) const TDIGEST_BACKLOG_SIZE: usize = 100;
pub(crate) const MEASUREMENT_COMPRESSION: f64 = 10.;

/// Run latencies are tracked in microseconds, from 1µs up to one hour.
pub(crate) const HISTOGRAM_MAX_MICROS: u64 = 3_600_000_000;
pub(crate) const HISTOGRAM_SIGFIGS: u8 = 3;
