//! A user-based load generator.
//!
//! A Scenario is an async function that one simulated user runs in a loop. Stampede spawns users
//! at a fixed rate, paces each of them at a constant throughput, and records every
//! [`#[transaction]`](stampede_macros::transaction) into cumulative [`RunStatistics`]. When the
//! run ends the statistics are handed to a single completion handler, which may set the process
//! exit status.
//!
//! ```no_run
//! use stampede::prelude::*;
//! use std::num::NonZeroU32;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let report = my_scenario()
//!         .users(NonZeroU32::new(10).unwrap())
//!         .spawn_rate(NonZeroU32::new(5).unwrap())
//!         .duration(Duration::from_secs(30))
//!         .on_quit(|stats, exit_status| {
//!             exit_status.set(u8::from(stats.fail_ratio() > 0.01));
//!         })
//!         .await;
//!
//!     report.exit_code()
//! }
//!
//! #[scenario]
//! async fn my_scenario() {
//!     let _ = my_transaction().await;
//! }
//!
//! #[transaction]
//! async fn my_transaction() -> Result<(), std::io::Error> {
//!     Ok(())
//! }
//! ```

// Lets the macros' `::stampede::` paths resolve inside this crate's own tests.
extern crate self as stampede;

mod sampler;
pub mod scenario;
#[doc(hidden)]
pub mod transaction;

pub use scenario::{RunReport, Scenario};
pub use stampede_core as core;
pub use stampede_core::{ExitStatus, RunStatistics, RunSummary};
pub use stampede_macros::{scenario, transaction};

pub mod prelude {
    pub use crate::scenario::{ConfigurableScenario, RunReport, Scenario};
    pub use stampede_core::{ExitStatus, RunStatistics, RunSummary};
    pub use stampede_macros::{scenario, transaction};
}
