use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise logging, with an optional default directive taken from the TOML config.
/// `RUST_LOG` still wins over both.
pub fn init_logger(verbose: bool, configured_level: Option<&str>) {
    let default_directive = match (verbose, configured_level) {
        (true, _) => "java_typeinfo=debug,info".to_string(),
        (false, Some(level)) => format!("java_typeinfo={}", level),
        (false, None) => "java_typeinfo=info".to_string(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON output, for when the tool runs under a log collector.
pub fn init_json_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("java_typeinfo=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
