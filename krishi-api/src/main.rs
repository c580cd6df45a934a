use krishi_api::{app, AppState, AuthConfig};
use krishi_booking::BookingService;
use krishi_catalog::{CapacityValidator, PricingAdvisor, VendorDirectory};
use krishi_core::memory::MemoryDocumentStore;
use krishi_core::repository::DocumentStore;
use krishi_match::MatchScorer;
use krishi_store::app_config::{Config, StoreBackend};
use krishi_store::{DbClient, HttpPricingOracle, PgDocumentStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "krishi_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Krishi API on port {}", config.server.port);

    // Document store
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryDocumentStore::default())
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("store.database_url is required for the postgres backend"))?;
            let db = DbClient::new(url, config.store.max_connections).await?;
            db.migrate().await?;
            Arc::new(PgDocumentStore::new(db.pool.clone()))
        }
    };

    let capacity = CapacityValidator::new(config.capacity.clone());
    let directory = Arc::new(VendorDirectory::new(store.clone(), capacity.clone()));
    let bookings = Arc::new(BookingService::new(
        store.clone(),
        directory.clone(),
        config.booking.max_cas_retries,
    ));
    let scorer = Arc::new(MatchScorer::new(config.matching.clone(), capacity));

    // Pricing oracle is optional
    let timeout = Duration::from_millis(config.advisor.timeout_ms);
    let advisor = match config.advisor.endpoint.as_deref() {
        Some(endpoint) => {
            let oracle = HttpPricingOracle::new(endpoint, timeout)?;
            tracing::info!("Pricing advisor at {}", oracle.url());
            Some(Arc::new(PricingAdvisor::new(Arc::new(oracle), timeout)))
        }
        None => {
            tracing::warn!("No pricing advisor endpoint configured, suggestions disabled");
            None
        }
    };

    let app_state = AppState {
        directory,
        bookings,
        scorer,
        advisor,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
