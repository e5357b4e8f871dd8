use rest_loadtest::Settings;
use std::num::NonZeroU32;
use std::sync::OnceLock;
use tracing_subscriber::FmtSubscriber;
use url::Url;

pub fn init_tracing() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("rest_loadtest=debug,stampede=info,mock_service=info")
            .try_init();
    });
}

/// Start a mock service and point the settings at `prefix` on it.
pub async fn settings_for(prefix: &str) -> anyhow::Result<Settings> {
    init_tracing();
    let addr = mock_service::spawn().await?;
    let host = Url::parse(&format!("http://{addr}{prefix}"))?;

    Ok(Settings {
        host,
        users: NonZeroU32::new(2).unwrap(),
        spawn_rate: NonZeroU32::new(2).unwrap(),
        run_time: "3s".to_string(),
        print_stats: false,
        ..Settings::default()
    })
}
