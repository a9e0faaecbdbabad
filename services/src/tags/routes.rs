//! HTTP surface of the tag module.

use axum::{Json, Router, extract::State, routing::get};

use crate::AppState;
use crate::error::DomainError;
use crate::store::Store;

use super::TagWithStat;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", get(list))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<TagWithStat>>, DomainError> {
    let tags = super::query_tags_with_stat(&state.store).await?;
    Ok(Json(tags))
}
