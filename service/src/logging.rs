use crate::config::Config;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Transport and database crates whose records only show at TRACE.
const NOISY_DEPENDENCIES: &[&str] = &[
    "sqlx",
    "sea_orm",
    "tower",
    "tungstenite",
    "hyper",
    "axum",
    "reqwest",
];

pub struct Logger {}

impl Logger {
    /// Installs the terminal logger at `log_level_filter`. Hub keepalive records are
    /// emitted at TRACE, so they share the threshold that unmutes the dependencies.
    pub fn init_logger(config: &Config) {
        TermLogger::init(
            config.log_level_filter,
            Self::log_config(config.log_level_filter),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
        .expect("Failed to start simplelog");
    }

    fn muted_modules(level: LevelFilter) -> &'static [&'static str] {
        match level {
            LevelFilter::Trace => &[],
            _ => NOISY_DEPENDENCIES,
        }
    }

    fn log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_target_level(LevelFilter::Error)
            .set_thread_level(LevelFilter::Off);

        for module in Self::muted_modules(level) {
            builder.add_filter_ignore_str(*module);
        }

        builder.build()
    }
}
