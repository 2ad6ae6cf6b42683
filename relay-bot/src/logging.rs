use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` applies unless `verbose` is set.
pub fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug,hyper_util=info,h2=info,rustls=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow!("installing tracing subscriber: {}", e))
}
