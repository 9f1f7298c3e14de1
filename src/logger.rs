use log::LevelFilter;
use std::io::Write;

/// Initialize the logging system
///
/// Console logging is controlled via the `RUST_LOG` environment variable:
/// - `RUST_LOG=error` - Only errors
/// - `RUST_LOG=warn` - Warnings and errors
/// - `RUST_LOG=info` - Info, warnings, and errors (default)
/// - `RUST_LOG=debug` - Debug and above, including every git command issued
/// - `RUST_LOG=trace` - Everything
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// ## Examples
///
/// ```bash
/// # Show each git invocation
/// RUST_LOG=debug branch-warden branches --prefix renovate/
///
/// # Silence everything but failures
/// RUST_LOG=error branch-warden merge renovate/lodash
/// ```
pub fn init_logger() {
    let level = level_from(std::env::var("RUST_LOG").ok().as_deref());

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // Ignore error if logger is already initialized
}

/// Level used when `RUST_LOG` is unset or unparsable.
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}
