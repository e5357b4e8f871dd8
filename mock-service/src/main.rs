use tokio::net::TcpListener;
use tracing_subscriber::FmtSubscriber;

/// Matches the default `LOCUST_HOST`.
const ADDR: &str = "127.0.0.1:50000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=info")
        .init();

    tokio::task::spawn(async { mock_service::tps_measure_task().await });

    let listener = TcpListener::bind(ADDR).await?;
    tracing::info!("Listening on {ADDR}");
    mock_service::run(listener).await
}
