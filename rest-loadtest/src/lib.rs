//! Load test for a single REST endpoint.
//!
//! Settings are resolved once per process ([`config`]), every simulated user POSTs a
//! schema-checked payload ([`schema`], [`user`]), and when the run ends the [`judge`] turns the
//! aggregate statistics into the process exit status.
pub mod cli;
pub mod config;
pub mod error;
pub mod judge;
pub mod logging;
pub mod runner;
pub mod schema;
pub mod user;

pub use crate::config::{resolve, ConfigResolver, EnvState, LogLevel, Settings};
pub use crate::error::{ConfigError, RequestFailure, SchemaError, StartError};
pub use crate::judge::{CompletionJudge, Verdict, Violation};
pub use crate::runner::run;
