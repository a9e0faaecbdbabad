//! HTTP surface of the tag-assignment module.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    routing::post,
};

use crate::AppState;
use crate::error::DomainError;
use crate::session::Session;
use crate::store::Store;

use super::{TagAssignCreate, TagAssignCreated, TagAssignRelation};

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", post(create).delete(remove))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    body: Result<Json<TagAssignCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<TagAssignCreated>), DomainError> {
    let Json(input) = body.map_err(|err| DomainError::bad_param(err.body_text()))?;
    let created = super::create_tag_assign(
        &state.store,
        state.ids.as_ref(),
        state.clock.as_ref(),
        &input,
        &session,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    relation: Result<Query<TagAssignRelation>, QueryRejection>,
) -> Result<StatusCode, DomainError> {
    let Query(relation) = relation.map_err(|err| DomainError::bad_param(err.body_text()))?;
    super::delete_tag_assign(&state.store, &relation, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}
