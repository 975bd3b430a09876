use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Request spans from `TraceLayer` are emitted at debug.
pub const SERVER_FILTER: &str = "info,tower_http=debug";

/// Log to stderr so stdout stays clean for command output.
pub fn init() -> anyhow::Result<()> {
    init_with_default(DEFAULT_FILTER)
}

/// `RUST_LOG` wins over `default_directives` when set.
pub fn init_with_default(default_directives: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))
        .with_context(|| format!("build log filter from {default_directives:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
