use crate::{DEFAULT_SPAWN_RATE, DEFAULT_THROUGHPUT, DEFAULT_USERS};
use std::num::NonZeroU32;
use std::time::Duration;

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: String,
    pub users: NonZeroU32,
    pub spawn_rate: NonZeroU32,
    /// Iterations per second for each user. Non-positive or non-finite values disable pacing.
    pub throughput: f64,
    pub duration: Option<Duration>,
    pub print_stats: bool,
    pub only_summary: bool,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            users: DEFAULT_USERS,
            spawn_rate: DEFAULT_SPAWN_RATE,
            throughput: DEFAULT_THROUGHPUT,
            duration: None,
            print_stats: true,
            only_summary: false,
        }
    }

    /// Minimum time between two iterations of the same user.
    pub fn pacing_period(&self) -> Option<Duration> {
        if self.throughput.is_finite() && self.throughput > 0. {
            Some(Duration::from_secs_f64(1. / self.throughput))
        } else {
            None
        }
    }

    /// Number of users that should be running `elapsed` into the run.
    ///
    /// The first user starts immediately, the rest follow at `spawn_rate` per second.
    pub fn target_users(&self, elapsed: Duration) -> u32 {
        let spawned = 1. + (elapsed.as_secs_f64() * self.spawn_rate.get() as f64).floor();
        (spawned as u32).min(self.users.get())
    }
}
