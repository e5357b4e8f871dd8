//! Scenario logic and constants
use crate::sampler::{Sampler, Timer};
use stampede_core::{
    ExitStatus, Measurement, RunStatistics, ScenarioConfig, STATS_INTERVAL, TICK_INTERVAL,
};
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    process::ExitCode,
    task::{Context, Poll},
    time::{Duration, Instant},
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

type QuitHandler = Box<dyn FnOnce(&RunStatistics, &mut ExitStatus) + Send>;

/// Outcome of a finished Scenario run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStatistics,
    pub exit_status: ExitStatus,
}

impl RunReport {
    /// Process exit code chosen by the completion handler; 0 when it made no decision.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status.code())
    }
}

/// Load test scenario structure
///
/// Handler for running scenarios. Use the [`#[scenario]`](stampede_macros::scenario) macro to add
/// these methods to a plain function, or [`Scenario::new`] for a closure that captures state.
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    config: ScenarioConfig,
    on_quit: Option<QuitHandler>,
    runner_fut: Option<Pin<Box<dyn Future<Output = RunReport> + Send>>>,
}

impl<T> Scenario<T> {
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            config: ScenarioConfig::new(name),
            on_quit: None,
            runner_fut: None,
        }
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = RunReport;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let func = this.func.clone();
            let config = this.config.clone();
            let on_quit = this.on_quit.take();
            Box::pin(run(func, config, on_quit))
        });

        runner.as_mut().poll(cx)
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn users(self, users: NonZeroU32) -> Self;
    fn spawn_rate(self, spawn_rate: NonZeroU32) -> Self;
    fn throughput(self, per_user: f64) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn print_stats(self, enabled: bool) -> Self;
    fn only_summary(self, enabled: bool) -> Self;
    fn on_quit<H>(self, handler: H) -> Self
    where
        H: FnOnce(&RunStatistics, &mut ExitStatus) + Send + 'static;
}

impl<T, F> ConfigurableScenario<RunReport> for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    /// Number of simulated users to ramp up to.
    fn users(mut self, users: NonZeroU32) -> Self {
        self.config.users = users;
        self
    }

    /// Users started per second until `.users()` is reached.
    fn spawn_rate(mut self, spawn_rate: NonZeroU32) -> Self {
        self.config.spawn_rate = spawn_rate;
        self
    }

    /// Scenario iterations per second for each user (default 1).
    ///
    /// An iteration that takes longer than `1 / per_user` seconds is followed immediately by the
    /// next one. `0.` disables pacing.
    fn throughput(mut self, per_user: f64) -> Self {
        self.config.throughput = per_user;
        self
    }

    /// Run the scenario for the given duration.
    ///
    /// Without a duration the scenario runs until Ctrl-C.
    ///
    /// # Example
    /// ```no_run
    /// use stampede::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .duration(Duration::from_secs(120))
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Print the summary table to stdout when the run ends (default on).
    fn print_stats(mut self, enabled: bool) -> Self {
        self.config.print_stats = enabled;
        self
    }

    /// Skip the interim measurement lines while the run is in progress.
    fn only_summary(mut self, enabled: bool) -> Self {
        self.config.only_summary = enabled;
        self
    }

    /// Register the completion handler.
    ///
    /// It runs exactly once, after every user has stopped, and may set the exit status carried by
    /// the [`RunReport`]. Registering again replaces the previous handler.
    fn on_quit<H>(mut self, handler: H) -> Self
    where
        H: FnOnce(&RunStatistics, &mut ExitStatus) + Send + 'static,
    {
        self.on_quit = Some(Box::new(handler));
        self
    }
}

async fn run<T, F>(scenario: T, config: ScenarioConfig, on_quit: Option<QuitHandler>) -> RunReport
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let print_stats = config.print_stats;
    let stats = run_scenario(scenario, config).await;

    if print_stats {
        println!("{stats}");
    }

    let mut exit_status = ExitStatus::default();
    if let Some(handler) = on_quit {
        handler(&stats, &mut exit_status);
    }

    RunReport { stats, exit_status }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F>(scenario: T, config: ScenarioConfig) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    info!("Running {} with config {:?}", config.name, &config);

    let start = Instant::now();
    let mut sampler = Sampler::new(scenario, config.pacing_period());
    let mut stats = RunStatistics::new(&config.name);
    let mut timer = Timer::new(TICK_INTERVAL).await;
    debug!("Ticking every {timer}");
    let mut since_measurement = Duration::ZERO;

    let interrupted = interrupted();
    tokio::pin!(interrupted);

    loop {
        let elapsed = start.elapsed();
        if let Some(duration) = config.duration {
            if elapsed >= duration {
                break;
            }
        }

        let target = config.target_users(elapsed) as usize;
        if target != sampler.users() {
            sampler.set_users(target);
            debug!("Running {target} users");

            #[cfg(feature = "metrics")]
            metrics::gauge!(format!("stampede_{}_users", &config.name)).set(target as f64);
        }

        tokio::select! {
            _ = &mut interrupted => {
                warn!("Interrupted; stopping users.");
                break;
            }
            tick = timer.tick() => {
                since_measurement += tick;
            }
        }

        if since_measurement >= STATS_INTERVAL {
            let data = sampler.collect();
            stats.record(&data);

            if config.print_stats && !config.only_summary {
                info!("{}", Measurement::new(&data, since_measurement));
            }
            since_measurement = Duration::ZERO;
        }
    }

    stats.users = sampler.users() as u32;
    let data = sampler.shutdown().await;
    stats.record(&data);
    stats.elapsed = start.elapsed();

    info!("Scenario complete");

    stats
}

async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const FAIL_EVERY: usize = 4;
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    #[scenario]
    async fn mock_scenario() {
        let _ = mock_transaction().await;
    }

    #[transaction]
    async fn mock_transaction() -> Result<(), String> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if CALLS.fetch_add(1, Ordering::Relaxed) % FAIL_EVERY == 0 {
            Err("mock failure".to_string())
        } else {
            Ok(())
        }
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(20_000)]
    async fn run_reports_statistics_and_exit_status() {
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let calls = handler_calls.clone();

        let report = mock_scenario()
            .users(NonZeroU32::new(4).unwrap())
            .spawn_rate(NonZeroU32::new(4).unwrap())
            .throughput(10.)
            .duration(Duration::from_millis(1_500))
            .print_stats(false)
            .on_quit(move |stats, exit_status| {
                calls.fetch_add(1, Ordering::Relaxed);
                exit_status.set(u8::from(stats.fail_ratio() > 0.01));
            })
            .await;

        assert_eq!(handler_calls.load(Ordering::Relaxed), 1);
        assert_eq!(report.stats.name, "mock_scenario");
        assert_eq!(report.stats.users, 4);
        assert!(report.stats.num_requests >= 10, "{}", report.stats.num_requests);
        assert!(report.stats.num_requests <= 80, "{}", report.stats.num_requests);
        assert!(report.stats.num_failures > 0);
        assert!(report.stats.elapsed >= Duration::from_millis(1_500));
        assert!(report.stats.avg_response_time() >= 2.);
        assert_eq!(report.exit_status.get(), Some(1));
        assert!(logs_contain("Scenario complete"));
    }

    #[tokio::test]
    #[ntest::timeout(20_000)]
    async fn closure_scenario_without_handler_exits_zero() {
        let iterations = Arc::new(AtomicUsize::new(0));
        let counter = iterations.clone();

        let report = Scenario::new("closure", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        })
        .throughput(20.)
        .duration(Duration::from_millis(500))
        .print_stats(false)
        .await;

        assert!(iterations.load(Ordering::Relaxed) >= 5);
        // No transactions were recorded, only iterations.
        assert_eq!(report.stats.num_requests, 0);
        assert_eq!(report.exit_status.get(), None);
        assert_eq!(report.exit_status.code(), 0);
    }
}
