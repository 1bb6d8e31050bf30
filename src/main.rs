use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paysettle::config::Config;
use paysettle::gateways::{MobileMoneyGateway, MpesaClient};
use paysettle::modules::health::{DatabaseProbe, ReadinessProbe};
use paysettle::modules::health::controllers::health_controller;
use paysettle::reversals::RecoveryWorker;
use paysettle::{Services, Stores};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "paysettle={},actix_web=info",
            config.app.log_level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        environment = %config.app.env,
        bind_address = %config.server.bind_address(),
        "Starting paysettle"
    );

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!(
        pool_size = config.database.pool_size,
        "Database pool initialized"
    );

    let gateway: Option<Arc<dyn MobileMoneyGateway>> = match config.mpesa.take() {
        Some(mpesa) => {
            let client = MpesaClient::new(mpesa).context("Failed to build M-Pesa client")?;
            if !client.supports_reversal() {
                tracing::warn!("M-Pesa initiator not configured; gateway reversals disabled");
            }
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("M-Pesa credentials not configured; payment push disabled");
            None
        }
    };

    let query_timeout = config.database.query_timeout;
    let services = Services::build(Stores::mysql(db_pool.clone(), query_timeout), gateway);
    let probe: Arc<dyn ReadinessProbe> = Arc::new(DatabaseProbe::new(db_pool, query_timeout));

    let worker = Arc::new(RecoveryWorker::new(
        services.reversals.clone(),
        config.recovery.clone(),
    ));
    tokio::spawn(worker.start());

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(probe.clone()))
            .configure(health_controller::configure)
            .configure(move |cfg| services.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!(bind_address = %bind_address, "Server started");

    server.await.context("HTTP server failed")
}
