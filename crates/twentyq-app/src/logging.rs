use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber for the interactive binary.
///
/// `RUST_LOG` wins unless `verbose` is set, which forces engine debug output. Calling this
/// twice is harmless; the second install is ignored.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("twentyq=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
