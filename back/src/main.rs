use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use tokio::time;

use back::store::AppState;

const FLUSH_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(name = "back", about = "REST backend for the tareas task manager")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Path of the task snapshot file.
    #[arg(long, default_value = "tareas.ron")]
    data: PathBuf,

    /// TLS certificate in PEM format. The `SSL_CERT` environment variable
    /// takes precedence.
    #[arg(long)]
    cert: Option<PathBuf>,

    /// TLS private key in PEM format. The `SSL_KEY` environment variable
    /// takes precedence.
    #[arg(long)]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cert = env::var("SSL_CERT").map(PathBuf::from).ok().or(args.cert);
    let key = env::var("SSL_KEY").map(PathBuf::from).ok().or(args.key);

    let state = Arc::new(AppState::load(&args.data)?);

    tokio::spawn({
        let state = state.clone();
        async move {
            loop {
                time::sleep(FLUSH_INTERVAL).await;
                if let Err(err) = state.store_if_dirty().await {
                    tracing::error!("Failed to store data: {:?}", err);
                }
            }
        }
    });

    let app = back::app(state.clone());
    let addr = SocketAddr::from(([0; 4], args.port));
    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        }
    });

    match (cert, key) {
        (Some(cert), Some(key)) => {
            tracing::info!(%addr, "listening with TLS");
            let config = RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            tracing::info!(%addr, "listening");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    // Final flush so a clean shutdown never loses mutations.
    state.store_if_dirty().await?;

    Ok(())
}
