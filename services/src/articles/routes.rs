//! HTTP surface of the article module.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::error::DomainError;
use crate::session::Session;
use crate::store::{Id, Store};

use super::{ArticleCreate, ArticleDetail, ArticleMetaExt, ArticlePatch, ArticleQuery};

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(remove))
}

#[derive(Debug, Serialize)]
struct ArticleListBody {
    data: Vec<ArticleMetaExt>,
    total: i64,
}

#[derive(Debug, Serialize)]
struct ArticleCreatedBody {
    id: Id,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArticlePatchedBody {
    id: Id,
    modify_time: Option<DateTime<Utc>>,
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    query: Result<Query<ArticleQuery>, QueryRejection>,
) -> Result<Json<ArticleListBody>, DomainError> {
    let Query(query) = query.map_err(|err| DomainError::bad_param(err.body_text()))?;
    let (data, total) = super::query_articles(&state.store, &query, &session).await?;
    Ok(Json(ArticleListBody { data, total }))
}

async fn detail<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Path(id): Path<Id>,
) -> Result<Json<ArticleDetail>, DomainError> {
    let detail = super::detail_article(&state.store, id, &session).await?;
    Ok(Json(detail))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    body: Result<Json<ArticleCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ArticleCreatedBody>), DomainError> {
    // The permission check outranks body validation, so a bad payload from
    // a non-admin still answers 403.
    if !session.is_admin() {
        return Err(DomainError::Forbidden);
    }
    let Json(input) = body.map_err(|err| DomainError::bad_param(err.body_text()))?;
    let id = super::create_article(
        &state.store,
        state.ids.as_ref(),
        state.clock.as_ref(),
        input,
        &session,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ArticleCreatedBody { id })))
}

async fn update<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Path(id): Path<Id>,
    body: Result<Json<ArticlePatch>, JsonRejection>,
) -> Result<Json<ArticlePatchedBody>, DomainError> {
    let Json(patch) = body.map_err(|err| DomainError::bad_param(err.body_text()))?;
    let modify_time =
        super::patch_article(&state.store, state.clock.as_ref(), id, &patch, &session).await?;
    Ok(Json(ArticlePatchedBody { id, modify_time }))
}

async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Path(id): Path<Id>,
) -> Result<StatusCode, DomainError> {
    super::delete_article(&state.store, id, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}
