use std::io::Write;

use env_logger::DEFAULT_FILTER_ENV;
use log::LevelFilter;

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Module path of a log record relative to this crate, e.g. `server::allocation`.
/// Records from other crates keep their full target.
fn short_target(target: &str) -> &str {
    target
        .strip_prefix(CRATE_TARGET)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(target)
}

/// Configures the controller logger. `verbose` enables debug records and
/// millisecond timestamps; `RUST_LOG` overrides the level filter either way.
pub fn setup_logging(verbose: bool) {
    let mut builder = env_logger::Builder::default();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let has_debug = std::env::var(DEFAULT_FILTER_ENV)
        .map(|v| v.contains("debug"))
        .unwrap_or(false);
    let detailed = verbose || has_debug;

    // <time> <level> [<module>] <message>
    builder.format(move |buf, record| {
        let level_style = buf.default_level_style(record.level()).bold();
        let timestamp = if detailed {
            buf.timestamp_millis()
        } else {
            buf.timestamp_seconds()
        };
        writeln!(
            buf,
            "{timestamp} {level_style}{:<5}{level_style:#} [{}] {}",
            record.level(),
            short_target(record.target()),
            record.args()
        )
    });

    builder.parse_default_env();
    builder.init();
}

#[cfg(test)]
mod tests {
    use super::short_target;

    #[test]
    fn target_relative_to_crate() {
        assert_eq!(
            short_target("flight_scheduler::server::allocation"),
            "server::allocation"
        );
        assert_eq!(short_target("flight_scheduler"), "flight_scheduler");
        assert_eq!(short_target("flight_schedulers::x"), "flight_schedulers::x");
        assert_eq!(short_target("chumsky::error"), "chumsky::error");
    }
}
