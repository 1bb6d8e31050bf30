use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse, Responder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::core::deadline::bounded;
use crate::core::Result;

/// Liveness body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

/// Outcome of one dependency probe
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness body; `ready` is false when any probe failed
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: ProbeStatus,
}

/// A dependency the service needs before taking traffic
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> Result<()>;
}

/// Database round trip bounded by the store timeout
pub struct DatabaseProbe {
    pool: MySqlPool,
    timeout: Duration,
}

impl DatabaseProbe {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ReadinessProbe for DatabaseProbe {
    async fn check(&self) -> Result<()> {
        bounded(self.timeout, "readiness.database", async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}

/// GET /health
/// Liveness only; dependencies are not touched
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /ready
/// 503 until the database answers
pub async fn readiness_check(probe: web::Data<Arc<dyn ReadinessProbe>>) -> impl Responder {
    let database = match probe.check().await {
        Ok(()) => ProbeStatus { ok: true, error: None },
        Err(e) => {
            tracing::error!(error = %e, "Database readiness check failed");
            ProbeStatus {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    };

    let response = ReadinessResponse {
        ready: database.ok,
        database,
    };
    if response.ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Configure health check routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check));
}
