//! Mirrulations Common Library
//!
//! Shared plumbing for the Mirrulations workspace members. At the moment this
//! is the logging setup every binary goes through before doing real work.
//!
//! # Example
//!
//! ```no_run
//! use mirr_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput};
