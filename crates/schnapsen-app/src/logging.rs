use tracing_subscriber::{EnvFilter, fmt};

/// Structured log output for the whole process. `RUST_LOG` wins; otherwise
/// the debug flag picks the default level.
pub fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let subscriber = fmt::Subscriber::builder().with_env_filter(filter).finish();

    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
