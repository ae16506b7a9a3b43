// src/logger.rs
use env_logger::{Builder, Env, Target};
use std::io::Write;

/// Environment variable holding the log filter (`RUST_LOG` syntax).
pub const LOG_ENV: &str = "RHAKE_LOG";

/// Installs the stderr logger. `--trace` raises the default filter to debug.
pub fn init(trace: bool) {
    let default_filter = if trace { "debug" } else { "off" };
    let mut builder = Builder::from_env(Env::new().filter_or(LOG_ENV, default_filter));

    builder.target(Target::Stderr).format(|buf, record| {
        writeln!(
            buf,
            "[{:>5} {}:{}] {}",
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}

/// Re-export logging macros
#[allow(unused_imports)]
pub use log::{debug, error, info, trace, warn};
