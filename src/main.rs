use anyhow::{Context, Result};
use axum::middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use dealboard::{
    DatabasePool, HubConfig, HttpPushTransport, LedgerStore, MemoryLedgerStore, ModerationLedger,
    NotificationService, StaleViewRegistry, SubscriptionStore,
    api::{
        ApiState, SecurityState, body_size_middleware, create_router, gateway_middleware,
        logging_middleware, rate_limit_middleware, security_headers_middleware,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = HubConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check the DEALBOARD_* environment variables.");
        e
    })?;

    init_logging(&config)?;
    info!("Starting dealboard");

    let (ledger_store, subscription_store) = open_stores(&config).await?;

    let policy = Arc::new(config.to_policy());
    if policy.is_empty() {
        warn!("Admin allow-list is empty");
    }

    let views = Arc::new(StaleViewRegistry::new());
    let ledger = ModerationLedger::new(ledger_store, policy.clone(), config.to_thresholds())
        .with_invalidator(views.clone());
    info!(
        backend = ledger.backend_tag(),
        stock_expiry_threshold = ledger.thresholds().stock_expiry_threshold,
        abuse_rejection_threshold = ledger.thresholds().abuse_rejection_threshold,
        "Moderation ledger ready"
    );

    let transport = HttpPushTransport::new(config.to_transport_config())
        .context("Failed to create push transport")?;
    let public_key = transport.vapid_public_key().map(str::to_string);
    let notifications = NotificationService::new(subscription_store, Arc::new(transport), policy)
        .with_concurrency(config.push.max_concurrency)
        .with_public_key(public_key);

    let security_state = SecurityState::new(config.to_security_config());
    spawn_rate_limit_cleanup(&security_state);

    let app = create_router(ApiState {
        ledger: Arc::new(ledger),
        notifications: Arc::new(notifications),
        views,
    })
    // Outermost layer runs first: logging, headers, gateway, size, rate
    .layer(middleware::from_fn_with_state(
        security_state.clone(),
        rate_limit_middleware,
    ))
    .layer(middleware::from_fn_with_state(
        security_state.clone(),
        body_size_middleware,
    ))
    .layer(middleware::from_fn_with_state(
        security_state.clone(),
        gateway_middleware,
    ))
    .layer(middleware::from_fn(security_headers_middleware))
    .layer(middleware::from_fn_with_state(
        security_state.clone(),
        logging_middleware,
    ))
    .layer(TraceLayer::new_for_http());

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!(
        addr = %bind_addr,
        rate_limit = config.security.rate_limit_per_minute,
        max_body_kb = config.security.max_request_size / 1024,
        gateway_token = config.security.gateway_token.is_some(),
        trust_identity_header = config.security.trust_identity_header,
        "dealboard listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn open_stores(config: &HubConfig) -> Result<(Arc<dyn LedgerStore>, Arc<dyn SubscriptionStore>)> {
    if !config.database.postgres_enabled {
        warn!("PostgreSQL disabled; using the in-memory store (data is lost on restart)");
        let store = Arc::new(MemoryLedgerStore::new());
        let ledger_store: Arc<dyn LedgerStore> = store.clone();
        let subscription_store: Arc<dyn SubscriptionStore> = store;
        return Ok((ledger_store, subscription_store));
    }

    let pool = DatabasePool::new(&config.database.postgres_url, config.database.max_connections)
        .await
        .context("Failed to open PostgreSQL pool")?;
    pool.init_schema().await.context("Failed to initialize schema")?;

    let pool = Arc::new(pool);
    let ledger_store: Arc<dyn LedgerStore> = pool.clone();
    let subscription_store: Arc<dyn SubscriptionStore> = pool;
    Ok((ledger_store, subscription_store))
}

fn spawn_rate_limit_cleanup(state: &SecurityState) {
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });
}

fn init_logging(config: &HubConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if config.logging.sanitize_logs {
        info!("Log sanitization enabled");
    }
    Ok(())
}
