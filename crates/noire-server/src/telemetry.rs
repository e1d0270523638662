use axum::{body::Body, http::Request, response::Response};
use opentelemetry::{
    global,
    trace::{SpanKind, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use std::{
    future::Future,
    pin::Pin,
    sync::OnceLock,
    task::{Context as TaskContext, Poll},
};
use tower::{Layer, Service};
use tracing_subscriber::EnvFilter;

use crate::auth::jwt::Claims;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

/// Install the `tracing` subscriber for local logs. Filter comes from
/// `RUST_LOG`, defaulting to `info` for this crate and `warn` elsewhere.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,noire_server=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    // No `LogTracer` here: the `log` slot belongs to the OTLP bridge.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn tls_enabled(endpoint: &str) -> bool {
    endpoint.starts_with("https://")
}

/// Ingestion key as gRPC metadata, when configured and well formed.
fn ingestion_metadata() -> Option<opentelemetry_otlp::tonic_types::metadata::MetadataMap> {
    let key = std::env::var("SIGNOZ_INGESTION_KEY").ok().filter(|k| !k.is_empty())?;
    let value = match key.parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("SIGNOZ_INGESTION_KEY is not a valid header value, ignoring it");
            return None;
        }
    };
    let mut metadata = opentelemetry_otlp::tonic_types::metadata::MetadataMap::new();
    metadata.insert("signoz-ingestion-key", value);
    Some(metadata)
}

/// Set up the OpenTelemetry trace and log exporters and register them
/// globally. Does nothing when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
///
/// Reads config from environment:
///   - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector gRPC address
///   - `OTEL_SERVICE_NAME`: service name tag (default: `noire`)
///   - `SIGNOZ_INGESTION_KEY`: collector access token (optional)
///   - `DEPLOY_ENV`: deployment environment tag (default: `development`)
///
/// Must be called from within the Tokio runtime.
pub fn init_telemetry() -> Result<(), opentelemetry_otlp::ExporterBuildError> {
    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(ep) => ep,
        Err(_) => {
            tracing::info!("OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping OTLP telemetry");
            return Ok(());
        }
    };

    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "noire".to_string());
    let environment = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if tls_enabled(&endpoint) {
        builder = builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(metadata) = ingestion_metadata() {
        builder = builder.with_metadata(metadata);
    }
    let exporter = builder.build()?;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(provider);

    // -- Log exporter --
    // Bridged from the `log` crate. `tracing` is built with `log-always`, so
    // every event also becomes a `log` record and reaches this exporter.
    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if tls_enabled(&endpoint) {
        log_builder = log_builder.with_tls_config(
            opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots(),
        );
    }
    if let Some(metadata) = ingestion_metadata() {
        log_builder = log_builder.with_metadata(metadata);
    }
    let log_exporter = log_builder.build()?;

    let logger_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();
    let logger_provider = LOGGER_PROVIDER.get_or_init(|| logger_provider);

    let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(logger_provider);
    match log::set_boxed_logger(Box::new(bridge)) {
        Ok(()) => {
            log::set_max_level(log::LevelFilter::Info);
            tracing::info!("log bridge active, logs exporting over OTLP");
        }
        Err(_) => {
            tracing::warn!("log bridge skipped, a `log` logger is already set");
        }
    }

    tracing::info!(version = APP_VERSION, endpoint = %endpoint, "telemetry initialized");
    Ok(())
}

/// Collapse numeric path segments so spans group by route:
/// `/api/cases/42/cadet_review` becomes `/api/cases/{id}/cadet_review`.
fn route_template(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Tower layer that creates an OpenTelemetry span for each HTTP request.
///
/// Captures: method, route, user-agent, request ID, response status, and
/// the authenticated user (if present).
#[derive(Clone)]
pub struct OtelTraceLayer;

impl<S> Layer<S> for OtelTraceLayer {
    type Service = OtelTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OtelTraceService { inner }
    }
}

#[derive(Clone)]
pub struct OtelTraceService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OtelTraceService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let tracer = global::tracer("noire");
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let auth_attrs: Vec<KeyValue> = if let Some(claims) = req.extensions().get::<Claims>() {
            vec![
                KeyValue::new("user.id", claims.sub),
                KeyValue::new("user.roles", claims.roles.join(",")),
                KeyValue::new("auth.status", "authenticated"),
            ]
        } else {
            vec![KeyValue::new("auth.status", "anonymous")]
        };

        let route = route_template(&path);
        let mut attributes = vec![
            KeyValue::new("http.method", method.clone()),
            KeyValue::new("http.target", path),
            KeyValue::new("http.route", route.clone()),
            KeyValue::new("http.user_agent", user_agent),
            KeyValue::new("http.request_id", request_id),
        ];
        attributes.extend(auth_attrs);

        let span = tracer
            .span_builder(format!("{method} {route}"))
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        let cx = Context::current_with_span(span);
        let mut inner = self.inner.clone();

        let guard = cx.clone().attach();
        let future = inner.call(req);
        drop(guard);

        Box::pin(async move {
            let response = future.await?;

            let span = cx.span();
            let status = response.status();
            span.set_attribute(KeyValue::new("http.status_code", status.as_u16() as i64));

            if status.is_server_error() {
                span.set_status(opentelemetry::trace::Status::error(status.to_string()));
            } else if status.is_client_error() {
                span.set_attribute(KeyValue::new("error.type", "client_error"));
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn numeric_segments_become_placeholders() {
        assert_eq!(
            route_template("/api/cases/42/cadet_review"),
            "/api/cases/{id}/cadet_review"
        );
        assert_eq!(
            route_template("/api/investigation/board-items/7"),
            "/api/investigation/board-items/{id}"
        );
    }

    #[test]
    fn static_paths_are_unchanged() {
        assert_eq!(route_template("/api/cases/public"), "/api/cases/public");
        assert_eq!(route_template("/health"), "/health");
        assert_eq!(route_template("/"), "/");
    }

    #[test]
    fn mixed_segments_are_kept() {
        assert_eq!(route_template("/api/v2x/9a"), "/api/v2x/9a");
    }

    struct Captured(Mutex<Vec<String>>);

    impl log::Log for Captured {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            self.0.lock().unwrap().push(record.args().to_string());
        }
        fn flush(&self) {}
    }

    static CAPTURED: Captured = Captured(Mutex::new(Vec::new()));

    #[test]
    fn tracing_events_become_log_records() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Info);

        tracing::info!(case_id = 7, "case moved to trial");

        let records = CAPTURED.0.lock().unwrap();
        assert!(records.iter().any(|r| r.contains("case moved to trial")));
    }

    #[test]
    fn https_endpoints_enable_tls() {
        assert!(tls_enabled("https://ingest.example.com:443"));
        assert!(!tls_enabled("http://localhost:4317"));
    }
}
