use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Log target shared by the library and the binary.
const TARGET: &str = "zenglitch";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `zenglitch=<level>`, so dependencies stay quiet.
fn directive(level: LogLevel) -> String {
    format!("{TARGET}={}", level.as_str())
}

/// An explicit level wins; otherwise `RUST_LOG`, falling back to warnings.
fn filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(directive(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directive(LogLevel::Warn))),
    }
}

/// Install the stderr subscriber. A second call is a no-op.
pub fn init_logging(format: LogFormat, level: Option<LogLevel>) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_to_this_crate() {
        assert_eq!(directive(LogLevel::Info), "zenglitch=info");
        assert_eq!(directive(LogLevel::Trace), "zenglitch=trace");
    }
}
