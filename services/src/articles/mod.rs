//! Article domain model and workflows.
//!
//! Listing and detail reads apply one visibility rule; mutations are gated
//! by the permission and concurrency guards and run inside a storage
//! transaction. Tag hydration for listings is batched so a page of
//! articles costs at most two extra queries, never one per row.

pub mod routes;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::DomainError;
use crate::guard;
use crate::idgen::IdGenerator;
use crate::session::Session;
use crate::store::{Id, Store, StoreTx};
use crate::tags::Tag;

/// Fixed page size for article listings.
pub const PAGE_SIZE: i64 = 10;

macro_rules! small_int_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
        #[serde(into = "i16", try_from = "i16")]
        #[repr(i16)]
        pub enum $name {
            $($variant = $value),+
        }

        impl From<$name> for i16 {
            fn from(value: $name) -> Self {
                value as i16
            }
        }

        impl TryFrom<i16> for $name {
            type Error = String;

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("invalid ", stringify!($name), " value {}"),
                        other
                    )),
                }
            }
        }
    };
}
pub(crate) use small_int_enum;

small_int_enum! {
    /// Broad article category.
    GenericType {
        Unclassify = 1,
        It = 2,
        Other = 3,
    }
}

small_int_enum! {
    /// Publication state. Drafts are visible only to their author.
    ArticleStatus {
        Draft = 0,
        Published = 1,
    }
}

small_int_enum! {
    /// Provenance of the article body.
    ArticleSource {
        Original = 1,
        Translate = 2,
        Note = 3,
        Reference = 4,
    }
}

impl Default for GenericType {
    fn default() -> Self {
        Self::Unclassify
    }
}

impl Default for ArticleStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Default for ArticleSource {
    fn default() -> Self {
        Self::Original
    }
}

/// Everything about an article except its body. This is the listing shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMeta {
    pub id: Id,
    pub uid: Id,
    pub title: String,
    pub abstracts: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: GenericType,
    pub source: ArticleSource,
    pub status: ArticleStatus,
    pub is_invalid: bool,
    pub is_elite: bool,
    pub is_top: bool,
    pub view_num: i32,
    pub comment_num: i32,
    pub create_time: DateTime<Utc>,
    pub modify_time: DateTime<Utc>,
}

/// A full article row: metadata plus the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleRecord {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub meta: ArticleMeta,
    pub content: String,
}

/// Listing entry with hydrated tags. `tags` stays `None` (serialized as
/// `null`) when the article has no assignments; it is never an empty list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleMetaExt {
    #[serde(flatten)]
    pub meta: ArticleMeta,
    pub tags: Option<Vec<Tag>>,
}

/// Detail response: the full row with hydrated tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub record: ArticleRecord,
    pub tags: Option<Vec<Tag>>,
}

/// Query-string parameters of the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub kw: String,
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

/// Creation payload. Unset fields fall back to their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArticleCreate {
    pub title: String,
    pub content: String,
    pub abstracts: String,
    #[serde(rename = "type")]
    pub kind: GenericType,
    pub source: ArticleSource,
    pub status: ArticleStatus,
    pub is_elite: bool,
    pub is_top: bool,
}

impl Default for ArticleCreate {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            abstracts: String::new(),
            kind: GenericType::default(),
            source: ArticleSource::default(),
            status: ArticleStatus::default(),
            is_elite: false,
            is_top: false,
        }
    }
}

/// Partial-update payload. Absent fields are left untouched;
/// `baseModifyTime`, when given, must not be older than the stored row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub abstracts: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<GenericType>,
    pub source: Option<ArticleSource>,
    pub status: Option<ArticleStatus>,
    pub is_elite: Option<bool>,
    pub is_top: Option<bool>,
    pub base_modify_time: Option<DateTime<Utc>>,
}

impl ArticlePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Column set written by a sparse article update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub abstracts: Option<String>,
    pub kind: Option<GenericType>,
    pub source: Option<ArticleSource>,
    pub status: Option<ArticleStatus>,
    pub is_elite: Option<bool>,
    pub is_top: Option<bool>,
    pub modify_time: DateTime<Utc>,
}

impl ArticleChanges {
    pub fn from_patch(patch: &ArticlePatch, modify_time: DateTime<Utc>) -> Self {
        Self {
            title: patch.title.clone(),
            content: patch.content.clone(),
            abstracts: patch.abstracts.clone(),
            kind: patch.kind,
            source: patch.source,
            status: patch.status,
            is_elite: patch.is_elite,
            is_top: patch.is_top,
            modify_time,
        }
    }

    /// True when no column beyond `modify_time` would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.abstracts.is_none()
            && self.kind.is_none()
            && self.source.is_none()
            && self.status.is_none()
            && self.is_elite.is_none()
            && self.is_top.is_none()
    }
}

/// Normalized listing filter handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListSpec {
    pub keyword: Option<String>,
    pub offset: i64,
    pub limit: i64,
    pub caller_id: Id,
}

/// The one visibility rule shared by listing and detail reads.
pub fn visible_to(meta: &ArticleMeta, caller_id: Id) -> bool {
    !meta.is_invalid && (meta.status == ArticleStatus::Published || meta.uid == caller_id)
}

/// One page of visible articles, newest first with pinned articles on top,
/// plus the total matching count for pagination.
pub async fn query_articles<S: Store>(
    store: &S,
    query: &ArticleQuery,
    session: &Session,
) -> Result<(Vec<ArticleMetaExt>, i64), DomainError> {
    let keyword = (!query.kw.is_empty()).then(|| query.kw.clone());
    let spec = ArticleListSpec {
        keyword,
        offset: ((query.page - 1) * PAGE_SIZE).max(0),
        limit: PAGE_SIZE,
        caller_id: session.identity.id,
    };

    let metas = store.list_articles(&spec).await?;
    let total = store.count_articles(&spec).await?;
    let articles = append_tags(store, metas).await?;
    Ok((articles, total))
}

/// Hydrates tags onto a page of articles with batched queries: one for the
/// assignments of the whole page and, only when any exist, one for the
/// distinct tags. Tags keep the order in which they were first assigned.
pub async fn append_tags<S: Store>(
    store: &S,
    metas: Vec<ArticleMeta>,
) -> Result<Vec<ArticleMetaExt>, DomainError> {
    if metas.is_empty() {
        return Ok(Vec::new());
    }

    let res_ids: Vec<Id> = metas.iter().map(|meta| meta.id).collect();
    let assigns = store.tag_assigns_for(&res_ids).await?;

    let mut articles: Vec<ArticleMetaExt> = metas
        .into_iter()
        .map(|meta| ArticleMetaExt { meta, tags: None })
        .collect();
    if assigns.is_empty() {
        return Ok(articles);
    }

    let mut assigned: HashMap<Id, HashSet<Id>> = HashMap::new();
    let mut tag_ids: Vec<Id> = Vec::new();
    let mut seen: HashSet<Id> = HashSet::new();
    for assign in &assigns {
        assigned
            .entry(assign.res_id)
            .or_default()
            .insert(assign.tag_id);
        if seen.insert(assign.tag_id) {
            tag_ids.push(assign.tag_id);
        }
    }

    let tags = store.tags_by_ids(&tag_ids).await?;
    for tag in &tags {
        for article in &mut articles {
            let has_tag = assigned
                .get(&article.meta.id)
                .is_some_and(|ids| ids.contains(&tag.id));
            if has_tag {
                article.tags.get_or_insert_with(Vec::new).push(tag.clone());
            }
        }
    }
    Ok(articles)
}

/// Full article body with hydrated tags, subject to the visibility rule.
pub async fn detail_article<S: Store>(
    store: &S,
    id: Id,
    session: &Session,
) -> Result<ArticleDetail, DomainError> {
    let record = store.article_detail(id, session.identity.id).await?;

    let assigns = store.tag_assigns_for(&[id]).await?;
    let tags = if assigns.is_empty() {
        None
    } else {
        let mut tag_ids: Vec<Id> = Vec::new();
        let mut seen: HashSet<Id> = HashSet::new();
        for assign in &assigns {
            if seen.insert(assign.tag_id) {
                tag_ids.push(assign.tag_id);
            }
        }
        Some(store.tags_by_ids(&tag_ids).await?)
    };

    Ok(ArticleDetail { record, tags })
}

/// Creates an article. Admin-only; the permission check runs before any
/// input validation so non-admins learn nothing about the payload rules.
pub async fn create_article<S: Store>(
    store: &S,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
    input: ArticleCreate,
    session: &Session,
) -> Result<Id, DomainError> {
    if !session.is_admin() {
        return Err(DomainError::Forbidden);
    }
    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(DomainError::bad_param("title and content are required"));
    }

    let now = clock.now();
    let id = ids.next_id();
    let record = ArticleRecord {
        meta: ArticleMeta {
            id,
            uid: session.identity.id,
            title: input.title,
            abstracts: input.abstracts,
            kind: input.kind,
            source: input.source,
            status: input.status,
            is_invalid: false,
            is_elite: input.is_elite,
            is_top: input.is_top,
            view_num: 0,
            comment_num: 0,
            create_time: now,
            modify_time: now,
        },
        content: input.content,
    };
    store.insert_article(&record).await?;
    tracing::info!(article_id = id, "article created");
    Ok(id)
}

/// Applies a sparse update. Returns the new modification time, or `None`
/// when the patch carried nothing at all and no transaction was opened.
pub async fn patch_article<S: Store>(
    store: &S,
    clock: &dyn Clock,
    id: Id,
    patch: &ArticlePatch,
    session: &Session,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    if patch.is_empty() {
        return Ok(None);
    }

    let mut tx = store.begin().await?;
    guard::check_perm(&mut tx, id, session).await?;
    guard::check_modify_behind(&mut tx, id, patch.base_modify_time).await?;

    let now = clock.now();
    let changes = ArticleChanges::from_patch(patch, now);
    if !changes.is_empty() {
        tx.update_article(id, &changes).await?;
    }
    tx.commit().await?;
    Ok(Some(now))
}

/// Deletes an article and every tag assignment pointing at it, in one
/// transaction. Non-admin deletes stay scoped to the caller's own rows.
pub async fn delete_article<S: Store>(
    store: &S,
    id: Id,
    session: &Session,
) -> Result<(), DomainError> {
    let mut tx = store.begin().await?;
    guard::check_perm(&mut tx, id, session).await?;

    let owner = (!session.is_admin()).then_some(session.identity.id);
    tx.delete_article(id, owner).await?;
    tx.clear_tag_assigns(id).await?;
    tx.commit().await?;
    tracing::info!(article_id = id, "article deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::idgen::SequenceIdGenerator;
    use crate::session::Identity;
    use crate::store::mem::MemStore;
    use crate::tag_assigns::{ResType, TagAssignment};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn user(id: Id) -> Session {
        Session {
            identity: Identity {
                id,
                name: format!("user-{id}"),
                is_admin: false,
            },
        }
    }

    fn article(id: Id, uid: Id, title: &str) -> ArticleRecord {
        ArticleRecord {
            meta: ArticleMeta {
                id,
                uid,
                title: title.to_owned(),
                abstracts: String::new(),
                kind: GenericType::Unclassify,
                source: ArticleSource::Original,
                status: ArticleStatus::Published,
                is_invalid: false,
                is_elite: false,
                is_top: false,
                view_num: 0,
                comment_num: 0,
                create_time: at(id),
                modify_time: at(id),
            },
            content: format!("body of {title}"),
        }
    }

    fn tag(id: Id, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_owned(),
            note: None,
            image: None,
            create_time: at(0),
            modify_time: at(0),
        }
    }

    fn assign(id: Id, res_id: Id, tag_id: Id) -> TagAssignment {
        TagAssignment {
            id,
            res_id,
            tag_id,
            res_type: ResType::Article,
            tag_order: 0,
            create_time: at(0),
        }
    }

    #[tokio::test]
    async fn guests_see_only_valid_published_articles() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "published"));
        let mut draft = article(2, 7, "draft");
        draft.meta.status = ArticleStatus::Draft;
        store.seed_article(draft);
        let mut invalid = article(3, 7, "invalid");
        invalid.meta.is_invalid = true;
        store.seed_article(invalid);

        let (articles, total) =
            query_articles(&store, &ArticleQuery::default(), &Session::guest())
                .await
                .unwrap();
        assert_eq!(total, 1);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].meta.title, "published");
    }

    #[tokio::test]
    async fn authors_see_their_own_drafts_but_never_invalid_rows() {
        let store = MemStore::new();
        let mut own_draft = article(1, 7, "mine");
        own_draft.meta.status = ArticleStatus::Draft;
        store.seed_article(own_draft);
        let mut other_draft = article(2, 8, "theirs");
        other_draft.meta.status = ArticleStatus::Draft;
        store.seed_article(other_draft);
        let mut own_invalid = article(3, 7, "gone");
        own_invalid.meta.is_invalid = true;
        store.seed_article(own_invalid);

        let (articles, total) = query_articles(&store, &ArticleQuery::default(), &user(7))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(articles[0].meta.title, "mine");
    }

    #[tokio::test]
    async fn listing_orders_pinned_first_then_newest() {
        let store = MemStore::new();
        store.seed_article(article(1, 1, "old"));
        store.seed_article(article(2, 1, "new"));
        let mut pinned = article(3, 1, "pinned-old");
        pinned.meta.is_top = true;
        pinned.meta.create_time = at(0);
        store.seed_article(pinned);

        let (articles, _) = query_articles(&store, &ArticleQuery::default(), &Session::guest())
            .await
            .unwrap();
        let titles: Vec<&str> = articles.iter().map(|a| a.meta.title.as_str()).collect();
        assert_eq!(titles, ["pinned-old", "new", "old"]);
    }

    #[tokio::test]
    async fn listing_paginates_in_fixed_pages() {
        let store = MemStore::new();
        for id in 1..=12 {
            store.seed_article(article(id, 1, &format!("a{id}")));
        }

        let page1 = ArticleQuery {
            kw: String::new(),
            page: 1,
        };
        let (articles, total) = query_articles(&store, &page1, &Session::guest())
            .await
            .unwrap();
        assert_eq!(total, 12);
        assert_eq!(articles.len(), 10);
        assert_eq!(articles[0].meta.title, "a12");

        let page2 = ArticleQuery {
            kw: String::new(),
            page: 2,
        };
        let (articles, total) = query_articles(&store, &page2, &Session::guest())
            .await
            .unwrap();
        assert_eq!(total, 12);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].meta.title, "a1");
    }

    #[tokio::test]
    async fn out_of_range_page_clamps_to_first() {
        let store = MemStore::new();
        store.seed_article(article(1, 1, "only"));

        let query = ArticleQuery {
            kw: String::new(),
            page: -3,
        };
        let (articles, _) = query_articles(&store, &query, &Session::guest())
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn keyword_filters_titles_case_insensitively() {
        let store = MemStore::new();
        store.seed_article(article(1, 1, "Rust in Action"));
        store.seed_article(article(2, 1, "Go in Practice"));
        store.seed_article(article(3, 1, "trust the process"));

        let query = ArticleQuery {
            kw: "rust".to_owned(),
            page: 1,
        };
        let (articles, total) = query_articles(&store, &query, &Session::guest())
            .await
            .unwrap();
        assert_eq!(total, 2);
        let titles: Vec<&str> = articles.iter().map(|a| a.meta.title.as_str()).collect();
        assert_eq!(titles, ["trust the process", "Rust in Action"]);
    }

    #[tokio::test]
    async fn append_tags_issues_no_queries_for_an_empty_page() {
        let store = MemStore::new();
        let before = store.read_count();
        let articles = append_tags(&store, Vec::new()).await.unwrap();
        assert!(articles.is_empty());
        assert_eq!(store.read_count(), before);
    }

    #[tokio::test]
    async fn append_tags_stops_after_one_query_without_assignments() {
        let store = MemStore::new();
        store.seed_article(article(1, 1, "bare"));
        let metas = vec![article(1, 1, "bare").meta];

        let before = store.read_count();
        let articles = append_tags(&store, metas).await.unwrap();
        assert_eq!(store.read_count() - before, 1);
        assert!(articles[0].tags.is_none());
    }

    #[tokio::test]
    async fn append_tags_batches_into_two_queries() {
        let store = MemStore::new();
        for id in 1..=3 {
            store.seed_article(article(id, 1, &format!("a{id}")));
        }
        store.seed_tag(tag(10, "rust"));
        store.seed_tag(tag(11, "web"));
        store.seed_assign(assign(100, 1, 10));
        store.seed_assign(assign(101, 2, 10));
        store.seed_assign(assign(102, 2, 11));

        let metas: Vec<ArticleMeta> = (1..=3).map(|id| article(id, 1, "t").meta).collect();
        let before = store.read_count();
        let articles = append_tags(&store, metas).await.unwrap();
        assert_eq!(store.read_count() - before, 2);

        assert_eq!(
            articles[0].tags.as_ref().map(Vec::len),
            Some(1),
            "article 1 carries the rust tag"
        );
        assert_eq!(articles[1].tags.as_ref().map(Vec::len), Some(2));
        assert!(articles[2].tags.is_none(), "untagged stays null, not empty");
    }

    #[tokio::test]
    async fn tags_keep_first_assignment_order() {
        let store = MemStore::new();
        store.seed_tag(tag(10, "zeta"));
        store.seed_tag(tag(11, "alpha"));
        store.seed_assign(assign(100, 1, 11));
        store.seed_assign(assign(101, 1, 10));

        let articles = append_tags(&store, vec![article(1, 1, "t").meta])
            .await
            .unwrap();
        let names: Vec<&str> = articles[0]
            .tags
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn detail_applies_the_visibility_rule() {
        let store = MemStore::new();
        let mut draft = article(1, 7, "draft");
        draft.meta.status = ArticleStatus::Draft;
        store.seed_article(draft);

        let err = detail_article(&store, 1, &Session::guest())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));

        let detail = detail_article(&store, 1, &user(7)).await.unwrap();
        assert_eq!(detail.record.meta.title, "draft");
        assert!(detail.tags.is_none());
    }

    #[tokio::test]
    async fn detail_hydrates_tags() {
        let store = MemStore::new();
        store.seed_article(article(1, 1, "tagged"));
        store.seed_tag(tag(10, "rust"));
        store.seed_assign(assign(100, 1, 10));

        let detail = detail_article(&store, 1, &Session::guest()).await.unwrap();
        let names: Vec<&str> = detail
            .tags
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, ["rust"]);
    }

    #[tokio::test]
    async fn create_rejects_non_admins_before_validation() {
        let store = MemStore::new();
        let ids = SequenceIdGenerator::starting_at(1);
        let clock = FixedClock(at(0));

        // Empty payload would be a bad parameter, but the permission
        // check must win.
        let err = create_article(&store, &ids, &clock, ArticleCreate::default(), &user(7))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
        // Nothing was consumed or written on the way out.
        assert_eq!(ids.next_id(), 1);
        assert_eq!(store.begin_count(), 0);
    }

    #[tokio::test]
    async fn create_requires_title_and_content() {
        let store = MemStore::new();
        let ids = SequenceIdGenerator::starting_at(1);
        let clock = FixedClock(at(0));

        let input = ArticleCreate {
            title: "  ".to_owned(),
            content: "body".to_owned(),
            ..ArticleCreate::default()
        };
        let err = create_article(&store, &ids, &clock, input, &Session::admin("root"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BadParam(_)));
    }

    #[tokio::test]
    async fn create_persists_flags_and_stamps_both_times() {
        let store = MemStore::new();
        let ids = SequenceIdGenerator::starting_at(42);
        let clock = FixedClock(at(5));

        let input = ArticleCreate {
            title: "hello".to_owned(),
            content: "world".to_owned(),
            is_elite: true,
            is_top: true,
            status: ArticleStatus::Published,
            ..ArticleCreate::default()
        };
        let id = create_article(&store, &ids, &clock, input, &Session::admin("root"))
            .await
            .unwrap();
        assert_eq!(id, 42);

        let stored = store.article(42).unwrap();
        assert_eq!(stored.meta.uid, 1);
        assert!(stored.meta.is_elite);
        assert!(stored.meta.is_top);
        assert!(!stored.meta.is_invalid);
        assert_eq!(stored.meta.create_time, at(5));
        assert_eq!(stored.meta.modify_time, at(5));
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op_without_a_transaction() {
        let store = MemStore::new();
        let clock = FixedClock(at(9));

        // Guest against a missing article: an empty patch short-circuits
        // before any permission or existence check.
        let result = patch_article(&store, &clock, 404, &ArticlePatch::default(), &Session::guest())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.begin_count(), 0);
    }

    #[tokio::test]
    async fn patch_rejects_non_owners() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "owned"));

        let patch = ArticlePatch {
            title: Some("stolen".to_owned()),
            ..ArticlePatch::default()
        };
        let err = patch_article(&store, &FixedClock(at(9)), 1, &patch, &user(8))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
        assert_eq!(store.article(1).unwrap().meta.title, "owned");
    }

    #[tokio::test]
    async fn patch_missing_article_is_not_found() {
        let store = MemStore::new();
        let patch = ArticlePatch {
            title: Some("x".to_owned()),
            ..ArticlePatch::default()
        };
        let err = patch_article(&store, &FixedClock(at(9)), 1, &patch, &user(8))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn stale_baseline_is_rejected() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "fresh"));

        let patch = ArticlePatch {
            title: Some("late".to_owned()),
            base_modify_time: Some(at(0)),
            ..ArticlePatch::default()
        };
        let err = patch_article(&store, &FixedClock(at(9)), 1, &patch, &user(7))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ModifyBehind));
        assert_eq!(store.article(1).unwrap().meta.title, "fresh");
    }

    #[tokio::test]
    async fn matching_baseline_passes_and_updates() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "old title"));

        let patch = ArticlePatch {
            title: Some("new title".to_owned()),
            base_modify_time: Some(at(1)),
            ..ArticlePatch::default()
        };
        let modified = patch_article(&store, &FixedClock(at(9)), 1, &patch, &user(7))
            .await
            .unwrap();
        assert_eq!(modified, Some(at(9)));

        let stored = store.article(1).unwrap();
        assert_eq!(stored.meta.title, "new title");
        assert_eq!(stored.meta.modify_time, at(9));
        assert_eq!(stored.meta.create_time, at(1), "create_time never moves");
    }

    #[tokio::test]
    async fn admin_may_patch_anyone() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "owned"));

        let patch = ArticlePatch {
            status: Some(ArticleStatus::Draft),
            ..ArticlePatch::default()
        };
        patch_article(&store, &FixedClock(at(9)), 1, &patch, &Session::admin("root"))
            .await
            .unwrap();
        assert_eq!(store.article(1).unwrap().meta.status, ArticleStatus::Draft);
    }

    #[tokio::test]
    async fn baseline_only_patch_checks_but_writes_nothing() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "kept"));

        let patch = ArticlePatch {
            base_modify_time: Some(at(1)),
            ..ArticlePatch::default()
        };
        let modified = patch_article(&store, &FixedClock(at(9)), 1, &patch, &user(7))
            .await
            .unwrap();
        assert_eq!(modified, Some(at(9)));
        // No column was named, so the row keeps its stored modify_time.
        assert_eq!(store.article(1).unwrap().meta.modify_time, at(1));
    }

    #[tokio::test]
    async fn delete_cascades_to_tag_assignments() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "doomed"));
        store.seed_tag(tag(10, "rust"));
        store.seed_assign(assign(100, 1, 10));
        store.seed_assign(assign(101, 2, 10));

        delete_article(&store, 1, &user(7)).await.unwrap();
        assert!(store.article(1).is_none());
        assert!(store.assigns_for(1).is_empty());
        assert_eq!(store.assigns_for(2).len(), 1, "other rows untouched");
    }

    #[tokio::test]
    async fn delete_rejects_non_owners_and_missing_rows() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "owned"));

        let err = delete_article(&store, 1, &user(8)).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
        assert!(store.article(1).is_some());

        let err = delete_article(&store, 2, &user(8)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn admin_may_delete_anyone() {
        let store = MemStore::new();
        store.seed_article(article(1, 7, "owned"));
        delete_article(&store, 1, &Session::admin("root")).await.unwrap();
        assert!(store.article(1).is_none());
    }

    #[test]
    fn status_round_trips_through_its_wire_value() {
        assert_eq!(i16::from(ArticleStatus::Published), 1);
        assert_eq!(ArticleStatus::try_from(0), Ok(ArticleStatus::Draft));
        assert!(ArticleSource::try_from(9).is_err());
    }

    #[test]
    fn untagged_article_serializes_tags_as_null() {
        let ext = ArticleMetaExt {
            meta: article(1, 1, "t").meta,
            tags: None,
        };
        let value = serde_json::to_value(&ext).unwrap();
        assert!(value.get("tags").unwrap().is_null());
        assert_eq!(value.get("type").unwrap(), 1);
        assert_eq!(value.get("isTop").unwrap(), false);
    }
}
