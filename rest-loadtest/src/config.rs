//! Settings resolution.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults for the selected [`EnvState`]
//! 2. the `.env` file at the workspace root (or the file given with `--env-file`)
//! 3. process environment variables with the same names
//!
//! The environment discriminator (`APP_ENV_STATE`) picks the variant, and the resolved
//! [`Settings::env_state`] always equals it.
use crate::error::ConfigError;
use figment::{
    providers::{Env, Serialized},
    value::{Dict, Map, Value},
    Figment, Metadata, Profile, Provider, Source,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// The only accepted value of `APP_NAME`.
pub const APP_NAME: &str = "locust_standalone";

const DOTENV_FILENAME: &str = ".env";
const DOTENV_PARENT_DIRS_UP: usize = 1;
const MIN_RUN_TIME_LEN: usize = 2;

/// Keys read from the `.env` file and the environment, lowercased.
const KEYS: [&str; 12] = [
    "app_name",
    "app_env_state",
    "random_seed",
    "locust_host",
    "locust_users",
    "locust_spawn_rate",
    "locust_run_time",
    "locust_tags",
    "locust_headless",
    "locust_print_stats",
    "locust_only_summary",
    "locust_loglevel",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvState {
    #[default]
    Development,
    Staging,
    Production,
}

impl EnvState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl FromStr for EnvState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvState(other.to_string())),
        }
    }
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `tracing` has no level above `ERROR`; `CRITICAL` maps onto it.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Critical => LevelFilter::ERROR,
        }
    }
}

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(deserialize_with = "trimmed_string")]
    pub app_name: String,
    #[serde(rename = "app_env_state")]
    pub env_state: EnvState,
    pub random_seed: u64,
    #[serde(rename = "locust_host")]
    pub host: Url,
    #[serde(rename = "locust_users")]
    pub users: NonZeroU32,
    #[serde(rename = "locust_spawn_rate")]
    pub spawn_rate: NonZeroU32,
    #[serde(rename = "locust_run_time", deserialize_with = "trimmed_string")]
    pub run_time: String,
    #[serde(rename = "locust_tags", deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(rename = "locust_headless", deserialize_with = "lenient_bool")]
    pub headless: bool,
    #[serde(rename = "locust_print_stats", deserialize_with = "lenient_bool")]
    pub print_stats: bool,
    #[serde(rename = "locust_only_summary", deserialize_with = "lenient_bool")]
    pub only_summary: bool,
    #[serde(rename = "locust_loglevel")]
    pub log_level: LogLevel,
}

impl Settings {
    /// Built-in defaults. Every variant currently shares them.
    pub fn defaults_for(env_state: EnvState) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            env_state,
            random_seed: 42,
            host: Url::parse("http://127.0.0.1:50000").expect("default host is a valid URL"),
            users: NonZeroU32::MIN.saturating_add(9),
            spawn_rate: NonZeroU32::MIN.saturating_add(4),
            run_time: "30s".to_string(),
            tags: vec!["rest_api".to_string(), "fast".to_string()],
            headless: true,
            print_stats: true,
            only_summary: true,
            log_level: LogLevel::Info,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name != APP_NAME {
            return Err(ConfigError::Invalid {
                field: "APP_NAME",
                reason: format!("expected '{APP_NAME}', got '{}'", self.app_name),
            });
        }

        if !matches!(self.host.scheme(), "http" | "https") || self.host.host_str().is_none() {
            return Err(ConfigError::Invalid {
                field: "LOCUST_HOST",
                reason: format!("'{}' is not an http(s) URL", self.host),
            });
        }

        self.run_duration().map(|_| ())
    }

    /// `LOCUST_RUN_TIME` as a duration, e.g. `30s` or `1m30s`.
    pub fn run_duration(&self) -> Result<Duration, ConfigError> {
        if self.run_time.chars().count() < MIN_RUN_TIME_LEN {
            return Err(ConfigError::Invalid {
                field: "LOCUST_RUN_TIME",
                reason: format!(
                    "'{}' is shorter than {MIN_RUN_TIME_LEN} characters",
                    self.run_time
                ),
            });
        }

        humantime::parse_duration(&self.run_time).map_err(|err| ConfigError::Invalid {
            field: "LOCUST_RUN_TIME",
            reason: format!("'{}': {err}", self.run_time),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults_for(EnvState::default())
    }
}

/// Layers defaults, the `.env` file and the environment into [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    dotenv: Option<PathBuf>,
}

impl ConfigResolver {
    /// Use the `.env` file at the workspace root, if there is one.
    pub fn locate() -> Self {
        Self {
            dotenv: default_dotenv_path(),
        }
    }

    pub fn with_dotenv(path: impl Into<PathBuf>) -> Self {
        Self {
            dotenv: Some(path.into()),
        }
    }

    pub fn without_dotenv() -> Self {
        Self { dotenv: None }
    }

    pub fn dotenv_path(&self) -> Option<&Path> {
        self.dotenv.as_deref()
    }

    /// Raw `APP_ENV_STATE` from the layered sources.
    pub fn discriminator(&self) -> Result<String, ConfigError> {
        Ok(self
            .figment(EnvState::default())?
            .extract_inner::<String>("app_env_state")?)
    }

    pub fn resolve(&self, discriminator: &str) -> Result<Settings, ConfigError> {
        let env_state: EnvState = discriminator.parse()?;

        let settings: Settings = self
            .figment(env_state)?
            .merge(Serialized::default("app_env_state", env_state))
            .extract()?;
        settings.validate()?;

        debug!("Resolved {env_state} settings: {settings:?}");
        Ok(settings)
    }

    /// Resolve the variant named by the sources themselves.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let discriminator = self.discriminator()?;
        self.resolve(&discriminator)
    }

    fn figment(&self, env_state: EnvState) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::defaults_for(env_state)));

        if let Some(path) = &self.dotenv {
            if path.exists() {
                figment = figment.merge(DotenvFile::read(path)?);
            } else {
                warn!("Dotenv file {} not found; skipping.", path.display());
            }
        }

        Ok(figment.merge(Env::raw().only(&KEYS)))
    }
}

/// Resolve with the default `.env` location.
pub fn resolve(discriminator: &str) -> Result<Settings, ConfigError> {
    ConfigResolver::locate().resolve(discriminator)
}

fn default_dotenv_path() -> Option<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(DOTENV_PARENT_DIRS_UP)
        .map(|dir| dir.join(DOTENV_FILENAME))
        .filter(|path| path.exists())
}

/// `figment` provider over a dotenv file, restricted to the known keys.
struct DotenvFile {
    path: PathBuf,
    dict: Dict,
}

impl DotenvFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let dotenv_err = |source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        };

        let mut dict = Dict::new();
        for item in dotenvy::from_path_iter(path).map_err(dotenv_err)? {
            let (key, value) = item.map_err(dotenv_err)?;
            let key = key.to_ascii_lowercase();
            if KEYS.contains(&key.as_str()) {
                let parsed = value.parse::<Value>().unwrap_or_else(|_| Value::from(value));
                dict.insert(key, parsed);
            } else {
                trace!("Ignoring unknown dotenv key {key}");
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            dict,
        })
    }
}

impl Provider for DotenvFile {
    fn metadata(&self) -> Metadata {
        Metadata::named("dotenv file").source(Source::File(self.path.clone()))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut map = Map::new();
        map.insert(Profile::Default, self.dict.clone());
        Ok(map)
    }
}

/// Accept any scalar as a string, trimmed.
fn trimmed_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct Stringly;

    impl<'de> de::Visitor<'de> for Stringly {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.trim().to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(Stringly)
}

/// `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off` and their one-letter forms, in any case.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct Boolish;

    impl<'de> de::Visitor<'de> for Boolish {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean such as true, false, 1, 0, yes, no, on or off")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
                "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
                _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
            }
        }
    }

    deserializer.deserialize_any(Boolish)
}

/// `["a", "b"]` or `a,b`.
fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    let items = match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };

    Ok(items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn resolve_in(jail: &Jail, discriminator: &str) -> Result<Settings, ConfigError> {
        ConfigResolver::with_dotenv(jail.directory().join(".env")).resolve(discriminator)
    }

    #[test]
    fn defaults_for_every_variant() {
        Jail::expect_with(|jail| {
            for state in ["development", "staging", "production"] {
                let settings = resolve_in(jail, state).map_err(|e| e.to_string())?;
                assert_eq!(settings.env_state.as_str(), state);
                assert_eq!(settings.app_name, APP_NAME);
                assert_eq!(settings.host.as_str(), "http://127.0.0.1:50000/");
                assert_eq!(settings.users.get(), 10);
                assert_eq!(settings.spawn_rate.get(), 5);
                assert_eq!(settings.run_duration().map_err(|e| e.to_string())?.as_secs(), 30);
                assert_eq!(settings.tags, vec!["rest_api", "fast"]);
                assert!(settings.headless && settings.print_stats && settings.only_summary);
                assert_eq!(settings.log_level, LogLevel::Info);
            }
            Ok(())
        });
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        Jail::expect_with(|jail| {
            let err = resolve_in(jail, "qa").expect_err("qa is not a variant");
            assert!(matches!(err, ConfigError::InvalidEnvState(_)));
            assert!(err.to_string().contains("qa"));

            jail.set_env("APP_ENV_STATE", "qa");
            let err = ConfigResolver::without_dotenv()
                .load()
                .expect_err("qa is not a variant");
            assert!(err.to_string().contains("'APP_ENV_STATE': qa."));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_dotenv() {
        Jail::expect_with(|jail| {
            jail.create_file(".env", "LOCUST_USERS=10\nLOCUST_SPAWN_RATE=3\n")?;
            jail.set_env("LOCUST_USERS", 25);

            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert_eq!(settings.users.get(), 25);
            assert_eq!(settings.spawn_rate.get(), 3);
            Ok(())
        });
    }

    #[test]
    fn discriminator_comes_from_sources() {
        Jail::expect_with(|jail| {
            jail.create_file(".env", "APP_ENV_STATE=staging\n")?;
            let resolver = ConfigResolver::with_dotenv(jail.directory().join(".env"));
            assert_eq!(resolver.discriminator().map_err(|e| e.to_string())?, "staging");
            assert_eq!(
                resolver.load().map_err(|e| e.to_string())?.env_state,
                EnvState::Staging
            );

            jail.set_env("APP_ENV_STATE", "production");
            assert_eq!(
                resolver.load().map_err(|e| e.to_string())?.env_state,
                EnvState::Production
            );
            Ok(())
        });
    }

    #[test]
    fn resolved_variant_follows_argument() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_ENV_STATE", "staging");
            let settings = resolve_in(jail, "production").map_err(|e| e.to_string())?;
            assert_eq!(settings.env_state, EnvState::Production);
            Ok(())
        });
    }

    #[test]
    fn missing_dotenv_is_not_an_error() {
        Jail::expect_with(|jail| {
            let settings = ConfigResolver::with_dotenv(jail.directory().join("missing.env"))
                .resolve("development")
                .map_err(|e| e.to_string())?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn tags_accept_list_and_csv() {
        Jail::expect_with(|jail| {
            jail.set_env("LOCUST_TAGS", r#"["slow", "rest_api"]"#);
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert_eq!(settings.tags, vec!["slow", "rest_api"]);

            jail.set_env("LOCUST_TAGS", "fast, smoke");
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert_eq!(settings.tags, vec!["fast", "smoke"]);
            Ok(())
        });
    }

    #[test]
    fn strings_are_trimmed() {
        Jail::expect_with(|jail| {
            jail.create_file(".env", "APP_NAME=\"  locust_standalone  \"\nLOCUST_RUN_TIME=\" 1m30s \"\n")?;
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert_eq!(settings.app_name, APP_NAME);
            assert_eq!(settings.run_duration().map_err(|e| e.to_string())?.as_secs(), 90);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_NAME", "other_app");
            let err = resolve_in(jail, "development").expect_err("wrong app name");
            assert!(matches!(err, ConfigError::Invalid { field: "APP_NAME", .. }));
            jail.set_env("APP_NAME", APP_NAME);

            jail.set_env("LOCUST_HOST", "ftp://127.0.0.1:21");
            let err = resolve_in(jail, "development").expect_err("ftp host");
            assert!(matches!(err, ConfigError::Invalid { field: "LOCUST_HOST", .. }));
            jail.set_env("LOCUST_HOST", "https://example.com");

            jail.set_env("LOCUST_RUN_TIME", "5");
            let err = resolve_in(jail, "development").expect_err("too short");
            assert!(matches!(err, ConfigError::Invalid { field: "LOCUST_RUN_TIME", .. }));

            jail.set_env("LOCUST_RUN_TIME", "soon");
            let err = resolve_in(jail, "development").expect_err("not a duration");
            assert!(matches!(err, ConfigError::Invalid { field: "LOCUST_RUN_TIME", .. }));
            jail.set_env("LOCUST_RUN_TIME", "10s");

            jail.set_env("LOCUST_USERS", 0);
            let err = resolve_in(jail, "development").expect_err("zero users");
            assert!(matches!(err, ConfigError::Extract(_)));
            Ok(())
        });
    }

    #[test]
    fn flags_accept_common_spellings() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".env",
                "LOCUST_HEADLESS=True\nLOCUST_PRINT_STATS=0\nLOCUST_ONLY_SUMMARY=off\n",
            )?;
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert!(settings.headless);
            assert!(!settings.print_stats);
            assert!(!settings.only_summary);

            jail.set_env("LOCUST_HEADLESS", "False");
            jail.set_env("LOCUST_PRINT_STATS", "1");
            jail.set_env("LOCUST_ONLY_SUMMARY", " YES ");
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert!(!settings.headless);
            assert!(settings.print_stats);
            assert!(settings.only_summary);

            jail.set_env("LOCUST_PRINT_STATS", "on");
            jail.set_env("LOCUST_ONLY_SUMMARY", "N");
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert!(settings.print_stats);
            assert!(!settings.only_summary);

            for bad in ["maybe", "2"] {
                jail.set_env("LOCUST_HEADLESS", bad);
                let err = resolve_in(jail, "development").expect_err("not a boolean");
                assert!(matches!(err, ConfigError::Extract(_)), "{bad}: {err}");
            }
            Ok(())
        });
    }

    #[test]
    fn log_levels() {
        Jail::expect_with(|jail| {
            jail.set_env("LOCUST_LOGLEVEL", "CRITICAL");
            let settings = resolve_in(jail, "development").map_err(|e| e.to_string())?;
            assert_eq!(settings.log_level, LogLevel::Critical);
            assert_eq!(settings.log_level.level_filter(), LevelFilter::ERROR);

            jail.set_env("LOCUST_LOGLEVEL", "verbose");
            assert!(resolve_in(jail, "development").is_err());
            Ok(())
        });
    }
}
