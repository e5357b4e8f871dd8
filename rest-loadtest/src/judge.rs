//! Pass/fail decision at the end of a run.
use stampede::{ExitStatus, RunSummary};
use std::fmt;
use tracing::{error, info, warn};

/// Failed requests, in percent of all requests.
pub const MAX_FAILURE_RATIO_PERCENT: f64 = 1.;
pub const MAX_AVG_RESPONSE_TIME_MS: f64 = 200.;
pub const RESPONSE_TIME_QUANTILE: f64 = 0.95;
pub const MAX_PERCENTILE_RESPONSE_TIME_MS: f64 = 800.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    FailureRatio,
    AvgResponseTime,
    PercentileResponseTime,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailureRatio => write!(f, "failure ratio > {MAX_FAILURE_RATIO_PERCENT}%"),
            Self::AvgResponseTime => {
                write!(f, "average response time > {MAX_AVG_RESPONSE_TIME_MS} ms")
            }
            Self::PercentileResponseTime => write!(
                f,
                "{}th percentile response time > {MAX_PERCENTILE_RESPONSE_TIME_MS} ms",
                (RESPONSE_TIME_QUANTILE * 100.).round() as u32
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Violation),
}

impl Verdict {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail(_) => 1,
        }
    }
}

/// Check the thresholds in order; the first one exceeded decides.
pub fn decide(stats: &impl RunSummary) -> Verdict {
    if stats.fail_ratio() * 100. > MAX_FAILURE_RATIO_PERCENT {
        Verdict::Fail(Violation::FailureRatio)
    } else if stats.avg_response_time() > MAX_AVG_RESPONSE_TIME_MS {
        Verdict::Fail(Violation::AvgResponseTime)
    } else if stats.response_time_percentile(RESPONSE_TIME_QUANTILE)
        > MAX_PERCENTILE_RESPONSE_TIME_MS
    {
        Verdict::Fail(Violation::PercentileResponseTime)
    } else {
        Verdict::Pass
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JudgeState {
    #[default]
    Running,
    Decided(Verdict),
}

/// Completion handler that turns the run statistics into the process exit status.
#[derive(Debug, Default)]
pub struct CompletionJudge {
    state: JudgeState,
}

impl CompletionJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JudgeState {
        self.state
    }

    /// Decide once. Later calls keep the first verdict and write it back again.
    pub fn on_quit(&mut self, stats: &impl RunSummary, exit_status: &mut ExitStatus) -> Verdict {
        let verdict = match self.state {
            JudgeState::Decided(verdict) => {
                warn!("Run already judged; keeping {verdict:?}");
                verdict
            }
            JudgeState::Running => {
                let verdict = decide(stats);
                match verdict {
                    Verdict::Fail(violation) => error!("Test failed due to {violation}"),
                    Verdict::Pass => info!("Test passed"),
                }
                self.state = JudgeState::Decided(verdict);
                verdict
            }
        };

        exit_status.set(verdict.exit_code());
        verdict
    }
}
