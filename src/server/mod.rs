pub mod api;
pub mod error;

use crate::cli::Args;
use api::AppState;
use axum_server::tls_rustls::RustlsConfig;
use log::{ error, info };
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid SERVER_ADDR '{}': {}", self.addr, e))?;

        if self.args.enable_tls {
            match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    info!(
                        "TLS enabled. Loading certificate from '{}' and key from '{}'",
                        cert_path,
                        key_path
                    );
                    self.serve_tls(addr, cert_path, key_path).await
                }
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    Err("Missing TLS certificate or key path".into())
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    Err("TLS enabled without cert/key".into())
                }
            }
        } else {
            self.serve_plain(addr).await
        }
    }

    async fn serve_plain(&self, addr: SocketAddr) -> Result<(), Box<dyn Error + Send + Sync>> {
        let listener = tokio::net::TcpListener::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);

        axum::serve(listener, api::router(self.state.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }

    async fn serve_tls(
        &self,
        addr: SocketAddr,
        cert_path: &str,
        key_path: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let handle = axum_server::Handle::new();

        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(api::router(self.state.clone()).into_make_service())
            .await?;
        info!("HTTPS server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
