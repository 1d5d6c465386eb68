//! Serve command implementation.

use crate::config::Settings;
use crate::server;

/// Run the companion server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    server::run_server(host, port, settings).await
}
