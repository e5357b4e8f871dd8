mod task_atomics;
mod timer;

pub(crate) use task_atomics::TaskAtomics;
pub(crate) use timer::Timer;

use crate::transaction::TRANSACTION_HOOK;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use stampede_core::SampleData;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Pool of simulated users, each one looping the scenario function in its own task.
pub(crate) struct Sampler<T> {
    scenario: T,
    pacing: Option<Duration>,
    tasks: Vec<JoinHandle<()>>,
    task_atomics: TaskAtomics,
}

impl<T, F> Sampler<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(scenario: T, pacing: Option<Duration>) -> Self {
        Self {
            scenario,
            pacing,
            tasks: vec![],
            task_atomics: TaskAtomics::new(),
        }
    }

    pub fn set_users(&mut self, users: usize) {
        if self.tasks.len() > users {
            for handle in self.tasks.drain(users..) {
                handle.abort();
            }
        } else {
            while self.tasks.len() < users {
                let scenario = self.scenario.clone();
                let pacing = self.pacing;
                let transaction_data = self.task_atomics.clone_to_transaction_data();
                let id = self.tasks.len();

                trace!("Spawning user {id}.");
                self.tasks.push(tokio::spawn(TRANSACTION_HOOK.scope(
                    transaction_data,
                    async move {
                        let limiter = pacing.and_then(user_limiter);
                        loop {
                            if let Some(limiter) = &limiter {
                                limiter.until_ready().await;
                            }
                            scenario().await;
                        }
                    },
                )));
            }
        }
    }

    pub fn users(&self) -> usize {
        self.tasks.len()
    }

    pub fn collect(&self) -> SampleData {
        self.task_atomics.collect()
    }

    /// Stop every user and wait until none of them is running, then drain the last counters.
    ///
    /// In-flight iterations are cancelled; only completed transactions are counted.
    pub async fn shutdown(mut self) -> SampleData {
        for handle in &self.tasks {
            handle.abort();
        }

        for handle in self.tasks.drain(..) {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("User task panicked: {err}");
                }
            }
        }

        self.task_atomics.collect()
    }
}

fn user_limiter(period: Duration) -> Option<DefaultDirectRateLimiter> {
    let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
    Some(RateLimiter::direct(quota))
}
