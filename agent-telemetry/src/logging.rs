use tracing_subscriber::EnvFilter;

/// Installs the human-readable console subscriber.
///
/// Returns `false` when another subscriber is already installed; console
/// output then goes wherever that subscriber sends it.
pub fn init_console_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter `{filter}`: {err}; falling back to `info`");
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
