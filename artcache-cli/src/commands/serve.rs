//! Serve command - run the HTTP server until interrupted.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::server;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub bind: Option<SocketAddr>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("serve");

    // CLI > config
    let addr = args.bind.unwrap_or(runner.config().server.bind);

    let shutdown = CancellationToken::new();
    let service = Arc::new(runner.create_service(shutdown.clone()).await?);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|error| CliError::Bind { addr, error })?;
    println!("artcache listening on http://{}", addr);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!(error = %e, "Failed to listen for ctrl-c, shutting down"),
        }
        signal_token.cancel();
    });

    let served = server::serve(listener, Arc::clone(&service), shutdown).await;
    service.shutdown();
    served.map_err(CliError::Serve)?;

    info!("Server stopped");
    Ok(())
}
