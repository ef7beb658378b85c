//local shortcuts
use marketflow_fanout::{build_router_default, ServerConfig, Supervisor};

mod dataflow_sim;

//third-party shortcuts
use tokio::net::TcpListener;

//standard shortcuts
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(marketflow_fanout::tracing_filter_from_env())
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let supervisor = Supervisor::new(config.clone());
    let app = build_router_default(supervisor.clone());

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    match marketflow_fanout::make_websocket_url(false, addr)
    {
        Ok(url) => tracing::info!(%url, "listening"),
        Err(()) => tracing::info!(%addr, "listening"),
    }

    if env::var("MARKETFLOW_DEMO_DATAFLOW").is_ok()
    {
        let router = supervisor.router();
        let period = Duration::from_millis(1);
        tracing::info!(?period, "starting synthetic dataflow generator");
        tokio::spawn(dataflow_sim::run(router, period));
    }

    let supervisor_shutdown = supervisor.clone();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received, draining");
        supervisor_shutdown.shutdown().await;
    };

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------
