mod utils;
use utils::*;

use rest_loadtest::judge::{decide, Verdict, Violation};
use stampede::prelude::*;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn healthy_endpoint_passes() -> anyhow::Result<()> {
    let settings = settings_for("").await?;
    let report = rest_loadtest::run(&settings).await?;

    assert!(report.stats.num_requests >= 3, "{}", report.stats.num_requests);
    assert_eq!(report.stats.num_failures, 0);
    assert!(report.stats.elapsed >= Duration::from_secs(3));
    assert_eq!(report.exit_status.get(), Some(0));
    assert_eq!(decide(&report.stats), Verdict::Pass);
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn malformed_response_is_counted_not_fatal() -> anyhow::Result<()> {
    let settings = settings_for("/malformed").await?;
    let report = rest_loadtest::run(&settings).await?;

    // The run keeps going for its full duration, every request failing.
    assert!(report.stats.num_requests >= 3, "{}", report.stats.num_requests);
    assert_eq!(report.stats.num_failures, report.stats.num_requests);
    assert!(report.stats.elapsed >= Duration::from_secs(3));
    assert_eq!(report.exit_status.get(), Some(1));
    assert_eq!(
        decide(&report.stats),
        Verdict::Fail(Violation::FailureRatio)
    );
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn error_member_fails_run() -> anyhow::Result<()> {
    let settings = settings_for("/error").await?;
    let report = rest_loadtest::run(&settings).await?;

    assert!(report.stats.num_failures > 0);
    assert_eq!(report.exit_status.get(), Some(1));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn server_errors_fail_run() -> anyhow::Result<()> {
    let settings = settings_for("/status/500").await?;
    let report = rest_loadtest::run(&settings).await?;

    assert_eq!(report.stats.num_failures, report.stats.num_requests);
    assert_eq!(report.exit_status.get(), Some(1));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn slow_endpoint_trips_average() -> anyhow::Result<()> {
    let settings = settings_for("/delay/ms/250").await?;
    let report = rest_loadtest::run(&settings).await?;

    assert_eq!(report.stats.num_failures, 0);
    assert!(report.stats.avg_response_time() > 200.);
    assert_eq!(report.exit_status.get(), Some(1));
    assert_eq!(
        decide(&report.stats),
        Verdict::Fail(Violation::AvgResponseTime)
    );
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unreachable_host_fails_run() -> anyhow::Result<()> {
    let mut settings = settings_for("").await?;
    // Nothing listens on the discard port.
    settings.host = url::Url::parse("http://127.0.0.1:9")?;
    let report = rest_loadtest::run(&settings).await?;

    assert!(report.stats.num_requests > 0);
    assert_eq!(report.stats.num_failures, report.stats.num_requests);
    assert_eq!(report.exit_status.get(), Some(1));
    Ok(())
}

#[tokio::test]
async fn idempotency_keys_are_required() -> anyhow::Result<()> {
    let addr = mock_service::spawn().await?;
    let url = format!("http://{addr}/api/v1/some_rest_api_endpoint");
    let body = serde_json::json!({ "requesting_service_name": "locust_standalone" });
    let client = reqwest::Client::new();

    let res = client
        .post(&url)
        .header("accept", "application/json")
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    for expected in [reqwest::StatusCode::OK, reqwest::StatusCode::CONFLICT] {
        let res = client
            .post(&url)
            .header("accept", "application/json")
            .header("idempotency-key", "fixed")
            .json(&body)
            .send()
            .await?;
        assert_eq!(res.status(), expected);
    }
    Ok(())
}
