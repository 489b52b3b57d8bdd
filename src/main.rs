#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use push_relay::{cfg::init_config, server::Server};
    use tokio::sync::oneshot;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let config = init_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    Server::start(config, shutdown_rx).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
