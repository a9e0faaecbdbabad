//! Storage abstraction for articles, tags and tag assignments.
//!
//! Handlers are generic over [`Store`] so the same routing and workflow code
//! runs against Postgres in production and the in-memory fake in tests.
//! Reads go straight through the pool; mutations that touch more than one
//! row (or need a permission lookup first) run inside a [`StoreTx`] so a
//! failure before [`StoreTx::commit`] leaves nothing half-applied.

pub mod mem;
pub mod pg;

use chrono::{DateTime, Utc};

use crate::articles::{ArticleChanges, ArticleListSpec, ArticleMeta, ArticleRecord};
use crate::error::DomainError;
use crate::tag_assigns::TagAssignment;
use crate::tags::Tag;

/// All persisted entities share one 64-bit id space.
pub type Id = i64;

/// Per-tag usage counts, joined onto tag listings.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TagUsage {
    pub tag_id: Id,
    pub count: i64,
}

pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    /// Opens a transaction for a multi-statement mutation.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, DomainError>> + Send;

    /// Cheap connectivity probe for the health endpoint.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// One page of article metadata, already filtered and ordered.
    fn list_articles(
        &self,
        spec: &ArticleListSpec,
    ) -> impl Future<Output = Result<Vec<ArticleMeta>, DomainError>> + Send;

    /// Total row count for the same filter as [`Store::list_articles`].
    fn count_articles(
        &self,
        spec: &ArticleListSpec,
    ) -> impl Future<Output = Result<i64, DomainError>> + Send;

    /// Full article body, applying the caller-dependent visibility rule.
    /// Fails with [`DomainError::NotFound`] when absent or not visible.
    fn article_detail(
        &self,
        id: Id,
        caller_id: Id,
    ) -> impl Future<Output = Result<ArticleRecord, DomainError>> + Send;

    fn insert_article(
        &self,
        article: &ArticleRecord,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Every assignment whose resource id is in `res_ids`, in one query.
    fn tag_assigns_for(
        &self,
        res_ids: &[Id],
    ) -> impl Future<Output = Result<Vec<TagAssignment>, DomainError>> + Send;

    /// Tags for the given ids, returned in the order the ids were given.
    fn tags_by_ids(&self, ids: &[Id])
    -> impl Future<Output = Result<Vec<Tag>, DomainError>> + Send;

    fn all_tags(&self) -> impl Future<Output = Result<Vec<Tag>, DomainError>> + Send;

    fn tag_usage_counts(&self) -> impl Future<Output = Result<Vec<TagUsage>, DomainError>> + Send;
}

pub trait StoreTx: Send {
    /// Owner uid of an article, or [`DomainError::NotFound`].
    fn article_owner(&mut self, id: Id) -> impl Future<Output = Result<Id, DomainError>> + Send;

    /// Last modification time of an article, or [`DomainError::NotFound`].
    fn article_modify_time(
        &mut self,
        id: Id,
    ) -> impl Future<Output = Result<DateTime<Utc>, DomainError>> + Send;

    /// Sparse update: only the fields set in `changes` are written.
    fn update_article(
        &mut self,
        id: Id,
        changes: &ArticleChanges,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Deletes an article. When `owner` is set the delete only matches rows
    /// owned by that uid, so a non-admin cannot race past the permission
    /// check.
    fn delete_article(
        &mut self,
        id: Id,
        owner: Option<Id>,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Removes every tag assignment pointing at a resource.
    fn clear_tag_assigns(
        &mut self,
        res_id: Id,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Case-insensitive lookup by tag name.
    fn find_tag_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Tag>, DomainError>> + Send;

    fn insert_tag(&mut self, tag: &Tag) -> impl Future<Output = Result<(), DomainError>> + Send;

    fn insert_tag_assign(
        &mut self,
        assign: &TagAssignment,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    fn delete_tag_assign(
        &mut self,
        res_id: Id,
        tag_id: Id,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), DomainError>> + Send;
}
