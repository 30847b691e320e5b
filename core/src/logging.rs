//! Tracing setup

use crate::config::AppConfig;
use anyhow::Result;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber: stdout plus a daily rolling file in
/// `<data_dir>/logs`
///
/// `RUST_LOG` wins over the configured level. Logs keep flowing to the file
/// only while the returned guard is alive.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
	let logs_dir = config.logs_dir();
	std::fs::create_dir_all(&logs_dir)?;

	let (non_blocking, guard) =
		tracing_appender::non_blocking(rolling::daily(logs_dir, "arbor.log"));

	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&config.log_level))?
		.add_directive("sea_orm=warn".parse()?)
		.add_directive("sqlx=warn".parse()?);

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer())
		.with(fmt::layer().with_writer(non_blocking).with_ansi(false))
		.try_init()?;

	Ok(guard)
}
