//! Tag model, listing and find-or-create.

pub mod routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::idgen::IdGenerator;
use crate::store::{Id, Store, StoreTx, TagUsage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Id,
    #[sqlx(rename = "tname")]
    pub name: String,
    pub note: Option<String>,
    #[sqlx(rename = "img")]
    pub image: Option<String>,
    pub create_time: DateTime<Utc>,
    pub modify_time: DateTime<Utc>,
}

/// A tag plus how many resources currently carry it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagWithStat {
    #[serde(flatten)]
    pub tag: Tag,
    pub count: i64,
}

/// Optional id filter for tag listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub ids: Vec<Id>,
}

/// All tags, or the ones named by id. An id filter preserves the order of
/// the requested ids.
pub async fn query_tags<S: Store>(store: &S, query: &TagQuery) -> Result<Vec<Tag>, DomainError> {
    if query.ids.is_empty() {
        store.all_tags().await
    } else {
        store.tags_by_ids(&query.ids).await
    }
}

/// All tags with usage counts, for the tag listing endpoint.
pub async fn query_tags_with_stat<S: Store>(store: &S) -> Result<Vec<TagWithStat>, DomainError> {
    let tags = store.all_tags().await?;
    let usages = store.tag_usage_counts().await?;
    Ok(extend_tags_stat(tags, &usages))
}

/// Joins usage counts onto tags; tags nobody uses get a zero count.
pub fn extend_tags_stat(tags: Vec<Tag>, usages: &[TagUsage]) -> Vec<TagWithStat> {
    let counts: HashMap<Id, i64> = usages
        .iter()
        .map(|usage| (usage.tag_id, usage.count))
        .collect();
    tags.into_iter()
        .map(|tag| {
            let count = counts.get(&tag.id).copied().unwrap_or(0);
            TagWithStat { tag, count }
        })
        .collect()
}

/// Looks a tag up by name (case-insensitive) and creates it when absent.
/// Runs inside the caller's transaction so the new tag commits or rolls
/// back together with the assignment that needed it.
pub async fn find_or_create_tag<T: StoreTx>(
    tx: &mut T,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
    name: &str,
) -> Result<Tag, DomainError> {
    if let Some(existing) = tx.find_tag_by_name(name).await? {
        return Ok(existing);
    }

    let now = clock.now();
    let tag = Tag {
        id: ids.next_id(),
        name: name.to_owned(),
        note: None,
        image: None,
        create_time: now,
        modify_time: now,
    };
    tx.insert_tag(&tag).await?;
    tracing::info!(tag_id = tag.id, tag_name = %tag.name, "tag created");
    Ok(tag)
}
