use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use snaplink_analytics::{AnalyticsConfig, AnalyticsService};
use snaplink_core::{ClickRepository, GeoLocator, LinkRepository};
use snaplink_enrichment::{GeoApiConfig, IpApiLocator, KnownPlatformReferers, UnknownLocator, WootheeClassifier};
use snaplink_gateway::cli::{LogFormat, StorageBackendArg, CLI};
use snaplink_gateway::{App, AppState};
use snaplink_generator::RandomGenerator;
use snaplink_redirector::{ClickRecorder, Enricher, RedirectorService};
use snaplink_shortener::{ShortenerConfig, ShortenerService};
use snaplink_storage::{InMemoryStore, MySqlStore};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        geo_lookup = config.geo_lookup,
        "starting snaplink gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => run(config, InMemoryStore::new()).await,
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn, config.mysql_max_connections)
                .await
                .context("failed to connect to mysql")?;
            store.migrate().await.context("failed to migrate schema")?;
            run(config, store).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run<S>(config: CLI, store: S) -> anyhow::Result<()>
where
    S: LinkRepository + ClickRepository + Clone,
{
    let generator = RandomGenerator::new(&config.alphabet)?;
    let shortener = ShortenerService::new(
        store.clone(),
        generator,
        ShortenerConfig::builder()
            .default_code_length(config.code_length)
            .build(),
    );

    let geo: Arc<dyn GeoLocator> = if config.geo_lookup {
        Arc::new(IpApiLocator::new(
            GeoApiConfig::builder()
                .url_template(config.geo_api_url.clone())
                .timeout(Duration::from_secs(config.geo_timeout_secs))
                .build(),
        ))
    } else {
        Arc::new(UnknownLocator)
    };
    let enricher = Enricher::new(
        Arc::new(WootheeClassifier::new()),
        Arc::new(KnownPlatformReferers::new()),
        geo,
    );
    let recorder = ClickRecorder::new(Arc::new(store.clone()), enricher);
    let redirector = RedirectorService::new(store.clone(), recorder.clone());
    let analytics = AnalyticsService::new(store.clone(), store, AnalyticsConfig::default());

    let state = AppState::new(
        Arc::new(shortener),
        Arc::new(redirector),
        Arc::new(analytics),
        config.base_url,
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    recorder.shutdown().await;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
