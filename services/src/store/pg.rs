//! Postgres-backed store.
//!
//! Queries are built at runtime; the dynamic ones (listing filter, sparse
//! update) go through [`QueryBuilder`] so every user value stays a bind
//! parameter. Tag fetches pin their result order to the requested id order
//! with `array_position`, which is what keeps first-assigned-first-listed
//! stable across pages.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::articles::{ArticleChanges, ArticleListSpec, ArticleMeta, ArticleRecord, ArticleStatus};
use crate::error::DomainError;
use crate::store::{Id, Store, StoreTx, TagUsage};
use crate::tag_assigns::{ResType, TagAssignment};
use crate::tags::Tag;

const META_COLUMNS: &str = "id, uid, title, abstracts, \"type\", source, status, \
     is_invalid, is_elite, is_top, view_num, comment_num, create_time, modify_time";

const TAG_COLUMNS: &str = "id, tname, note, img, create_time, modify_time";

const ASSIGN_COLUMNS: &str = "id, res_id, tag, res_type, tag_order, create_time";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared WHERE clause of the listing and its count query.
    fn push_list_filter<'args>(
        builder: &mut QueryBuilder<'args, Postgres>,
        spec: &'args ArticleListSpec,
    ) {
        builder.push(" WHERE is_invalid = FALSE AND (status = ");
        builder.push_bind(ArticleStatus::Published);
        builder.push(" OR uid = ");
        builder.push_bind(spec.caller_id);
        builder.push(")");
        if let Some(keyword) = &spec.keyword {
            builder.push(" AND title ILIKE ");
            builder.push_bind(format!("%{keyword}%"));
        }
    }
}

impl Store for PgStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<Self::Tx, DomainError> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTx { tx })
    }

    async fn is_connected(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    async fn list_articles(&self, spec: &ArticleListSpec) -> Result<Vec<ArticleMeta>, DomainError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {META_COLUMNS} FROM article"));
        Self::push_list_filter(&mut builder, spec);
        builder.push(" ORDER BY is_top DESC, create_time DESC OFFSET ");
        builder.push_bind(spec.offset);
        builder.push(" LIMIT ");
        builder.push_bind(spec.limit);

        let metas = builder
            .build_query_as::<ArticleMeta>()
            .fetch_all(&self.pool)
            .await?;
        Ok(metas)
    }

    async fn count_articles(&self, spec: &ArticleListSpec) -> Result<i64, DomainError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM article");
        Self::push_list_filter(&mut builder, spec);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn article_detail(&self, id: Id, caller_id: Id) -> Result<ArticleRecord, DomainError> {
        sqlx::query_as::<_, ArticleRecord>(&format!(
            "SELECT {META_COLUMNS}, content FROM article \
             WHERE id = $1 AND is_invalid = FALSE AND (status = $2 OR uid = $3)"
        ))
        .bind(id)
        .bind(ArticleStatus::Published)
        .bind(caller_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound)
    }

    async fn insert_article(&self, article: &ArticleRecord) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO article \
             (id, uid, title, abstracts, \"type\", source, status, is_invalid, is_elite, \
              is_top, view_num, comment_num, create_time, modify_time, content) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(article.meta.id)
        .bind(article.meta.uid)
        .bind(&article.meta.title)
        .bind(&article.meta.abstracts)
        .bind(article.meta.kind)
        .bind(article.meta.source)
        .bind(article.meta.status)
        .bind(article.meta.is_invalid)
        .bind(article.meta.is_elite)
        .bind(article.meta.is_top)
        .bind(article.meta.view_num)
        .bind(article.meta.comment_num)
        .bind(article.meta.create_time)
        .bind(article.meta.modify_time)
        .bind(&article.content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tag_assigns_for(&self, res_ids: &[Id]) -> Result<Vec<TagAssignment>, DomainError> {
        let assigns = sqlx::query_as::<_, TagAssignment>(&format!(
            "SELECT {ASSIGN_COLUMNS} FROM tag_assign \
             WHERE res_id = ANY($1) AND res_type = $2 ORDER BY id"
        ))
        .bind(res_ids)
        .bind(ResType::Article)
        .fetch_all(&self.pool)
        .await?;
        Ok(assigns)
    }

    async fn tags_by_ids(&self, ids: &[Id]) -> Result<Vec<Tag>, DomainError> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tag WHERE id = ANY($1) \
             ORDER BY array_position($1, id)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn all_tags(&self) -> Result<Vec<Tag>, DomainError> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tag ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn tag_usage_counts(&self) -> Result<Vec<TagUsage>, DomainError> {
        let usages = sqlx::query_as::<_, TagUsage>(
            "SELECT tag AS tag_id, COUNT(*) AS count FROM tag_assign GROUP BY tag",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(usages)
    }
}

pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

impl StoreTx for PgStoreTx {
    async fn article_owner(&mut self, id: Id) -> Result<Id, DomainError> {
        sqlx::query_scalar::<_, Id>("SELECT uid FROM article WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn article_modify_time(&mut self, id: Id) -> Result<DateTime<Utc>, DomainError> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT modify_time FROM article WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn update_article(&mut self, id: Id, changes: &ArticleChanges) -> Result<(), DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE article SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = &changes.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(content) = &changes.content {
            fields
                .push("content = ")
                .push_bind_unseparated(content.clone());
        }
        if let Some(abstracts) = &changes.abstracts {
            fields
                .push("abstracts = ")
                .push_bind_unseparated(abstracts.clone());
        }
        if let Some(kind) = changes.kind {
            fields.push("\"type\" = ").push_bind_unseparated(kind);
        }
        if let Some(source) = changes.source {
            fields.push("source = ").push_bind_unseparated(source);
        }
        if let Some(status) = changes.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(is_elite) = changes.is_elite {
            fields
                .push("is_elite = ")
                .push_bind_unseparated(is_elite);
        }
        if let Some(is_top) = changes.is_top {
            fields.push("is_top = ").push_bind_unseparated(is_top);
        }
        fields
            .push("modify_time = ")
            .push_bind_unseparated(changes.modify_time);

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn delete_article(&mut self, id: Id, owner: Option<Id>) -> Result<(), DomainError> {
        let result = match owner {
            Some(uid) => {
                sqlx::query("DELETE FROM article WHERE id = $1 AND uid = $2")
                    .bind(id)
                    .bind(uid)
                    .execute(&mut *self.tx)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM article WHERE id = $1")
                    .bind(id)
                    .execute(&mut *self.tx)
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn clear_tag_assigns(&mut self, res_id: Id) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM tag_assign WHERE res_id = $1")
            .bind(res_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, DomainError> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tag WHERE tname ILIKE $1 LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(tag)
    }

    async fn insert_tag(&mut self, tag: &Tag) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO tag (id, tname, note, img, create_time, modify_time) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.note)
        .bind(&tag.image)
        .bind(tag.create_time)
        .bind(tag.modify_time)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_tag_assign(&mut self, assign: &TagAssignment) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO tag_assign (id, res_id, tag, res_type, tag_order, create_time) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(assign.id)
        .bind(assign.res_id)
        .bind(assign.tag_id)
        .bind(assign.res_type)
        .bind(assign.tag_order)
        .bind(assign.create_time)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_tag_assign(&mut self, res_id: Id, tag_id: Id) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM tag_assign WHERE res_id = $1 AND tag = $2")
            .bind(res_id)
            .bind(tag_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), DomainError> {
        self.tx.commit().await?;
        Ok(())
    }
}
