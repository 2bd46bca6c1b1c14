/// Installs a process-wide `tracing` subscriber driven by `RUST_LOG`
/// (default `info`). Called once at CLI startup; the manager's lifecycle
/// events (admission, eviction, status transitions) flow through it since
/// a daemon process has no interactive terminal to colorize output for.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}
