use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::sync::OnceLock;
use std::time::Instant;

static STARTED: OnceLock<Instant> = OnceLock::new();

/// Crime levels the initial migration seeds. Fewer means the schema is
/// missing or was tampered with, and case filing cannot work.
const SEEDED_CRIME_LEVELS: i64 = 4;

/// Mark process start for the uptime figure. Call once from `main`.
pub fn record_start_time() {
    STARTED.get_or_init(Instant::now);
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DatabaseHealth {
    pub reachable: bool,
    /// Rows in `crime_levels`; case filing needs all of them.
    pub crime_levels: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseHealth {
    fn ready(&self) -> bool {
        self.reachable && self.crime_levels >= SEEDED_CRIME_LEVELS
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub service: &'static str,
    /// `ok` when the case store can take requests, else `degraded`.
    pub status: &'static str,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

async fn check_database(pool: &Pool<Sqlite>) -> DatabaseHealth {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM crime_levels")
        .fetch_one(pool)
        .await
    {
        Ok(crime_levels) => DatabaseHealth {
            reachable: true,
            crime_levels,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "health check could not read crime levels");
            DatabaseHealth {
                reachable: false,
                crime_levels: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

fn report(database: DatabaseHealth, uptime_seconds: u64) -> (StatusCode, HealthResponse) {
    let (code, status) = if database.ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        HealthResponse {
            service: "noire",
            status,
            database,
            uptime_seconds,
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Liveness plus case store readiness. 503 when the database is
/// unreachable or its reference data is missing.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Case store ready", body = HealthResponse),
        (status = 503, description = "Database unreachable or unseeded", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(pool): State<Pool<Sqlite>>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&pool).await;
    let uptime = STARTED.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);
    let (code, body) = report(database, uptime);
    (code, Json(body))
}
