//! Service metadata endpoint: which instance answered, and for how long
//! it has been up.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::clock::Clock;
use crate::idgen::IdGenerator;
use crate::store::{Id, Store};

pub const SERVICE_NAME: &str = "quillpost";

/// Fixed at startup; the instance id comes from the same generator that
/// numbers domain entities, so it is unique across restarts and replicas.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMeta {
    pub name: &'static str,
    pub instance_id: Id,
    pub start_time: DateTime<Utc>,
}

impl ServiceMeta {
    pub fn new(ids: &dyn IdGenerator, clock: &dyn Clock) -> Self {
        Self {
            name: SERVICE_NAME,
            instance_id: ids.next_id(),
            start_time: clock.now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceInfo {
    #[serde(flatten)]
    meta: ServiceMeta,
    uptime_seconds: i64,
}

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", get(service_meta))
}

async fn service_meta<S: Store>(State(state): State<AppState<S>>) -> Json<ServiceInfo> {
    let uptime_seconds = (state.clock.now() - state.meta.start_time).num_seconds();
    Json(ServiceInfo {
        meta: state.meta.clone(),
        uptime_seconds,
    })
}
