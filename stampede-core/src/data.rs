use crate::{MEASUREMENT_COMPRESSION, TDIGEST_BACKLOG_SIZE};
use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::time::Duration;
use tracing::error;

/// Raw counters drained from the running users since the previous collection.
#[derive(Debug, Clone, Default)]
pub struct SampleData {
    pub success: u64,
    pub error: u64,
    pub latency: Vec<Duration>,
}

impl SampleData {
    pub fn total(&self) -> u64 {
        self.success + self.error
    }
}

/// Interim measurement over one stats interval.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub rps: f64,
    pub fail_ratio: f64,
    pub elapsed: Duration,
    latency: TDigest<K1>,
}

impl Measurement {
    pub fn new(data: &SampleData, elapsed: Duration) -> Self {
        let total = data.total();
        let rps = total as f64 / elapsed.as_secs_f64();
        let fail_ratio = if total == 0 {
            0.
        } else {
            data.error as f64 / total as f64
        };

        let mut latency = default_tdigest(MEASUREMENT_COMPRESSION);
        for dur in &data.latency {
            latency.insert(dur.as_secs_f64());
        }

        Self {
            rps,
            fail_ratio,
            elapsed,
            latency,
        }
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        let secs = self.latency.quantile(quantile);

        // TDigest returns NaN when it holds no samples.
        let secs = if secs.is_finite() {
            secs
        } else {
            0.
        };

        Duration::from_secs_f64(secs)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RPS={:.2}, FailRatio={:.2}, p50={:?}, p90={:?}, p99={:?}",
            self.rps,
            self.fail_ratio,
            self.latency(0.5),
            self.latency(0.90),
            self.latency(0.99),
        )
    }
}

pub(crate) fn default_tdigest(compression: f64) -> TDigest<K1> {
    TDigest::new(K1::new(compression), TDIGEST_BACKLOG_SIZE)
}

pub(crate) fn finite_or_zero(value: f64, what: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        error!("Non-finite {what} calculation; reporting 0.");
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_rates() {
        let data = SampleData {
            success: 18,
            error: 2,
            latency: vec![Duration::from_millis(10); 20],
        };
        let measurement = Measurement::new(&data, Duration::from_secs(2));

        assert!((measurement.rps - 10.).abs() < f64::EPSILON);
        assert!((measurement.fail_ratio - 0.1).abs() < f64::EPSILON);
        let p50 = measurement.latency(0.5).as_secs_f64();
        assert!((p50 - 0.010).abs() < 0.001);
    }

    #[test]
    fn empty_measurement_reports_zero() {
        let measurement = Measurement::new(&SampleData::default(), Duration::from_secs(1));
        assert_eq!(measurement.rps, 0.);
        assert_eq!(measurement.fail_ratio, 0.);
        assert_eq!(measurement.latency(0.99), Duration::ZERO);
    }

    #[tracing_test::traced_test]
    #[test]
    fn non_finite_values_are_logged_and_zeroed() {
        assert_eq!(finite_or_zero(f64::NAN, "latency"), 0.);
        assert_eq!(finite_or_zero(f64::INFINITY, "rps"), 0.);
        assert_eq!(finite_or_zero(12.5, "rps"), 12.5);
        assert!(logs_contain("Non-finite latency calculation; reporting 0."));
        assert!(logs_contain("Non-finite rps calculation"));
    }
}
