use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use quillpost_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod articles;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod idgen;
pub mod meta;
pub mod session;
pub mod store;
pub mod tag_assigns;
pub mod tags;
pub mod telemetry;

use crate::clock::Clock;
use crate::config::Config;
use crate::idgen::IdGenerator;
use crate::meta::ServiceMeta;
use crate::store::Store;

/// Shared handler state: the store plus the injected id and time sources.
#[derive(Clone)]
pub struct AppState<S: Store> {
    pub store: S,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub meta: ServiceMeta,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        let meta = ServiceMeta::new(ids.as_ref(), clock.as_ref());
        Self {
            store,
            ids,
            clock,
            meta,
        }
    }
}

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Assembles the full application router.
pub fn routes<S: Store>(state: AppState<S>, config: Config) -> Router {
    let v1_routes = Router::new()
        .nest("/articles", articles::routes::router::<S>())
        .nest("/tags", tags::routes::router::<S>())
        .nest("/tag-assigns", tag_assigns::routes::router::<S>())
        .nest("/service-meta", meta::router::<S>());

    Router::new()
        .route("/is-health", get(health_check::<S>))
        .nest("/v1", v1_routes)
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Continue an incoming W3C trace context when one is present
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                );
                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S: Store>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    let mut response = if state.store.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let env_value = config.environment().to_string();
    response.headers_mut().insert(
        HeaderName::from_static("x-service-env"),
        HeaderValue::from_str(&env_value).expect("environment header is valid ASCII"),
    );

    let runtime_env: RuntimeEnv = config.environment().into();
    let version_value = format_version_for_runtime_env(runtime_env);
    response.headers_mut().insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_str(&version_value).expect("version header is valid ASCII"),
    );

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
