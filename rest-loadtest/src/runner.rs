use crate::config::Settings;
use crate::error::StartError;
use crate::judge::CompletionJudge;
use crate::user::RestUser;
use stampede::prelude::*;
use std::sync::Arc;
use tracing::{info, instrument};

/// Iterations per second for each user.
pub const USER_THROUGHPUT: f64 = 1.;

/// Scenario running [`RestUser::test_performance_some_rest_api_endpoint`] for every user.
pub fn rest_api_user(user: Arc<RestUser>) -> impl ConfigurableScenario<RunReport> {
    Scenario::new("rest_api_user", move || {
        let user = user.clone();
        async move {
            // Already logged; the iteration just ends.
            let _ = user.test_performance_some_rest_api_endpoint().await;
        }
    })
}

/// Run the load test described by `settings` and judge the outcome.
#[instrument(name = "load_test", skip_all, fields(env = %settings.env_state, host = %settings.host))]
pub async fn run(settings: &Settings) -> Result<RunReport, StartError> {
    if !RestUser::enabled_for(&settings.tags) {
        return Err(StartError::NoMatchingTask(settings.tags.clone()));
    }

    let duration = settings.run_duration()?;
    let user = Arc::new(RestUser::new(settings)?);
    info!(
        "Testing {} with {} users for {}",
        user.endpoint(),
        settings.users,
        humantime::format_duration(duration)
    );

    let mut judge = CompletionJudge::new();
    let report = rest_api_user(user)
        .users(settings.users)
        .spawn_rate(settings.spawn_rate)
        .throughput(USER_THROUGHPUT)
        .duration(duration)
        .print_stats(settings.print_stats)
        .only_summary(settings.only_summary)
        .on_quit(move |stats, exit_status| {
            judge.on_quit(stats, exit_status);
        })
        .await;

    Ok(report)
}
