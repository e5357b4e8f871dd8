use crate::{SampleData, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIGS, REPORTED_PERCENTILES};
use hdrhistogram::Histogram;
use std::fmt;
use std::time::Duration;

/// Aggregate figures a completion handler inspects at the end of a run.
///
/// Response times are in milliseconds.
pub trait RunSummary {
    /// Share of requests that failed, from 0.0 to 1.0.
    fn fail_ratio(&self) -> f64;

    /// Mean response time over every request, failed ones included.
    fn avg_response_time(&self) -> f64;

    /// Response time below which `quantile` (in `(0, 1]`) of the requests fall.
    ///
    /// This is a recorded response time, never an interpolation: the value at rank
    /// `floor(n * quantile) + 1` of the sorted latencies, capped at `n`.
    fn response_time_percentile(&self, quantile: f64) -> f64;
}

/// Cumulative statistics for a whole Scenario run.
///
/// Built by the engine while the run is in progress and handed, read-only, to the completion
/// handler once every user has stopped.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub name: String,
    pub users: u32,
    pub num_requests: u64,
    pub num_failures: u64,
    pub elapsed: Duration,
    total_response_time: Duration,
    min_response_time: Option<Duration>,
    max_response_time: Duration,
    latency: Histogram<u64>,
}

impl RunStatistics {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            users: 0,
            num_requests: 0,
            num_failures: 0,
            elapsed: Duration::ZERO,
            total_response_time: Duration::ZERO,
            min_response_time: None,
            max_response_time: Duration::ZERO,
            latency: Histogram::new_with_bounds(1, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIGS)
                .expect("histogram bounds are valid"),
        }
    }

    pub fn record(&mut self, data: &SampleData) {
        self.num_requests += data.total();
        self.num_failures += data.error;

        for latency in &data.latency {
            self.total_response_time += *latency;
            self.max_response_time = self.max_response_time.max(*latency);
            self.min_response_time = Some(match self.min_response_time {
                Some(min) => min.min(*latency),
                None => *latency,
            });
            let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
            self.latency.saturating_record(micros.max(1));
        }
    }

    pub fn num_successes(&self) -> u64 {
        self.num_requests - self.num_failures
    }

    pub fn min_response_time(&self) -> f64 {
        self.min_response_time.map(as_millis_f64).unwrap_or(0.)
    }

    pub fn max_response_time(&self) -> f64 {
        as_millis_f64(self.max_response_time)
    }

    pub fn median_response_time(&self) -> f64 {
        self.response_time_percentile(0.5)
    }

    pub fn total_rps(&self) -> f64 {
        if self.elapsed.is_zero() {
            0.
        } else {
            self.num_requests as f64 / self.elapsed.as_secs_f64()
        }
    }

    pub fn total_fail_per_sec(&self) -> f64 {
        if self.elapsed.is_zero() {
            0.
        } else {
            self.num_failures as f64 / self.elapsed.as_secs_f64()
        }
    }
}

impl RunSummary for RunStatistics {
    fn fail_ratio(&self) -> f64 {
        if self.num_requests == 0 {
            0.
        } else {
            self.num_failures as f64 / self.num_requests as f64
        }
    }

    fn avg_response_time(&self) -> f64 {
        if self.num_requests == 0 {
            0.
        } else {
            as_millis_f64(self.total_response_time) / self.num_requests as f64
        }
    }

    fn response_time_percentile(&self, quantile: f64) -> f64 {
        if self.num_requests == 0 {
            return 0.;
        }

        if quantile >= 1. {
            return self.max_response_time();
        }

        let total = self.latency.len();
        let rank = ((total as f64 * quantile.max(0.)).floor() as u64 + 1).min(total);

        let mut seen = 0;
        for bucket in self.latency.iter_recorded() {
            seen += bucket.count_at_value();
            if seen >= rank {
                let micros = self.latency.highest_equivalent(bucket.value_iterated_to());
                return (micros as f64 / 1_000.).min(self.max_response_time());
            }
        }
        self.max_response_time()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:>9} {:>12} | {:>7} {:>7} {:>7} {:>7} | {:>8} {:>10}",
            "Name", "# reqs", "# fails", "Avg", "Min", "Max", "Med", "req/s", "failures/s"
        )?;
        writeln!(f, "{}", "-".repeat(110))?;
        writeln!(
            f,
            "{:<28} {:>9} {:>5}({:>5.2}%) | {:>7.0} {:>7.0} {:>7.0} {:>7.0} | {:>8.2} {:>10.2}",
            self.name,
            self.num_requests,
            self.num_failures,
            self.fail_ratio() * 100.,
            self.avg_response_time(),
            self.min_response_time(),
            self.max_response_time(),
            self.median_response_time(),
            self.total_rps(),
            self.total_fail_per_sec(),
        )?;
        writeln!(f)?;

        write!(f, "Response time percentiles (ms) for {}:", self.name)?;
        for quantile in REPORTED_PERCENTILES {
            write!(
                f,
                " {}%={:.0}",
                (quantile * 10_000.).round() / 100.,
                self.response_time_percentile(quantile)
            )?;
        }
        Ok(())
    }
}

/// Exit status written back by the completion handler.
///
/// Unset means the handler made no decision; the process then exits with 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(Option<u8>);

impl ExitStatus {
    pub fn set(&mut self, code: u8) {
        self.0 = Some(code);
    }

    pub fn get(&self) -> Option<u8> {
        self.0
    }

    pub fn code(&self) -> u8 {
        self.0.unwrap_or(0)
    }
}

fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.
}
