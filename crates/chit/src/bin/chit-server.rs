use chit::ChitServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("CHIT_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = match ChitServer::builder().bind(&addr).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "failed to start server");
            std::process::exit(1);
        }
    };

    match server.local_addr() {
        Ok(local) => tracing::info!(addr = %local, "Chit server ready"),
        Err(e) => tracing::warn!(error = %e, "local address unavailable"),
    }

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
