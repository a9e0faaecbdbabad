//! Tag assignments: the join rows between tags and tagged resources.
//!
//! Articles are the only taggable resource today; `res_type` keeps the
//! rows self-describing so other resource kinds can share the table.

pub mod routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::articles::small_int_enum;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::guard;
use crate::idgen::IdGenerator;
use crate::session::Session;
use crate::store::{Id, Store, StoreTx};
use crate::tags;

small_int_enum! {
    /// Kind of resource a tag assignment points at.
    ResType {
        Article = 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignment {
    pub id: Id,
    pub res_id: Id,
    #[sqlx(rename = "tag")]
    pub tag_id: Id,
    pub res_type: ResType,
    pub tag_order: i32,
    pub create_time: DateTime<Utc>,
}

/// Creation payload: the tag is addressed by name and created on demand.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignCreate {
    #[serde(default)]
    pub res_id: Id,
    #[serde(default)]
    pub tag_name: String,
}

/// Addresses one assignment by its two endpoints, for deletion.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignRelation {
    pub res_id: Id,
    pub tag_id: Id,
}

/// Creation response: the stored row plus the resolved tag fields, so the
/// caller needs no follow-up lookup for a tag created on the fly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignCreated {
    #[serde(flatten)]
    pub assign: TagAssignment,
    pub tag_name: String,
    pub tag_note: Option<String>,
    pub tag_image: Option<String>,
}

/// Tags an article, creating the tag when the name is new. The caller must
/// own the article (or be admin); tag, assignment and permission lookup
/// share one transaction.
pub async fn create_tag_assign<S: Store>(
    store: &S,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
    input: &TagAssignCreate,
    session: &Session,
) -> Result<TagAssignCreated, DomainError> {
    let name = input.tag_name.trim();
    if input.res_id <= 0 || name.is_empty() {
        return Err(DomainError::bad_param("resId and tagName are required"));
    }

    let mut tx = store.begin().await?;
    guard::check_perm(&mut tx, input.res_id, session).await?;

    let tag = tags::find_or_create_tag(&mut tx, ids, clock, name).await?;
    let assign = TagAssignment {
        id: ids.next_id(),
        res_id: input.res_id,
        tag_id: tag.id,
        res_type: ResType::Article,
        tag_order: 0,
        create_time: clock.now(),
    };
    tx.insert_tag_assign(&assign).await?;
    tx.commit().await?;

    Ok(TagAssignCreated {
        assign,
        tag_name: tag.name,
        tag_note: tag.note,
        tag_image: tag.image,
    })
}

/// Removes one assignment. Permission follows the tagged article.
pub async fn delete_tag_assign<S: Store>(
    store: &S,
    relation: &TagAssignRelation,
    session: &Session,
) -> Result<(), DomainError> {
    let mut tx = store.begin().await?;
    guard::check_perm(&mut tx, relation.res_id, session).await?;
    tx.delete_tag_assign(relation.res_id, relation.tag_id)
        .await?;
    tx.commit().await?;
    Ok(())
}
