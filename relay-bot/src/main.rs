use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relay_bot::{init_tracing, ChatSessions, Cli, Relay};
use relay_telegram::Api;
use relay_updates::UpdateStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json)?;

    // Fail before consuming anything if storage or the token is unusable
    let sink_config = cli.sink()?;
    let sink = relay_blob::open_sink(&sink_config, cli.blob_config())
        .await
        .with_context(|| format!("opening {} sink", sink_config.kind()))?;

    let api = Api::connect(cli.token.clone(), cli.client_config())
        .await
        .context("checking bot token")?;
    let api = Arc::new(api);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let updates = UpdateStream::subscribe(api.clone(), 0, cancel, cli.stream_config());
    let relay = Relay::new(
        api,
        sink,
        ChatSessions::new(cli.session_ttl()),
        cli.relay_config(),
    );

    match relay.run(updates).await {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Update stream failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown requested, finishing the current batch");
    cancel.cancel();
}
