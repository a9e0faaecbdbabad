//! In-memory store used by unit and router tests.
//!
//! Mirrors the Postgres semantics closely enough for the workflows:
//! the same visibility rule, the same ordering, the same unique
//! constraint on assignments. A [`MemTx`] writes straight through to the
//! shared state; that is sound for the workflows here because every guard
//! runs before the first write, so a failed mutation has written nothing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::articles::{self, ArticleChanges, ArticleListSpec, ArticleMeta, ArticleRecord};
use crate::error::DomainError;
use crate::store::{Id, Store, StoreTx, TagUsage};
use crate::tag_assigns::TagAssignment;
use crate::tags::Tag;

#[derive(Default)]
struct MemInner {
    articles: Vec<ArticleRecord>,
    tags: Vec<Tag>,
    assigns: Vec<TagAssignment>,
}

#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<MemInner>>,
    reads: Arc<AtomicUsize>,
    begins: Arc<AtomicUsize>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of read queries issued so far, for asserting batch behavior.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of transactions opened so far.
    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::Relaxed)
    }

    pub fn seed_article(&self, article: ArticleRecord) {
        self.lock().articles.push(article);
    }

    pub fn seed_tag(&self, tag: Tag) {
        self.lock().tags.push(tag);
    }

    pub fn seed_assign(&self, assign: TagAssignment) {
        self.lock().assigns.push(assign);
    }

    pub fn article(&self, id: Id) -> Option<ArticleRecord> {
        self.lock().articles.iter().find(|a| a.meta.id == id).cloned()
    }

    pub fn assigns_for(&self, res_id: Id) -> Vec<TagAssignment> {
        self.lock()
            .assigns
            .iter()
            .filter(|a| a.res_id == res_id)
            .cloned()
            .collect()
    }

    fn matching_metas(&self, spec: &ArticleListSpec) -> Vec<ArticleMeta> {
        let keyword = spec.keyword.as_deref().map(str::to_lowercase);
        let mut metas: Vec<ArticleMeta> = self
            .lock()
            .articles
            .iter()
            .map(|a| &a.meta)
            .filter(|meta| articles::visible_to(meta, spec.caller_id))
            .filter(|meta| match &keyword {
                Some(kw) => meta.title.to_lowercase().contains(kw),
                None => true,
            })
            .cloned()
            .collect();
        metas.sort_by(|a, b| {
            b.is_top
                .cmp(&a.is_top)
                .then(b.create_time.cmp(&a.create_time))
        });
        metas
    }
}

impl Store for MemStore {
    type Tx = MemTx;

    async fn begin(&self) -> Result<Self::Tx, DomainError> {
        self.begins.fetch_add(1, Ordering::Relaxed);
        Ok(MemTx {
            store: self.clone(),
        })
    }

    async fn is_connected(&self) -> bool {
        true
    }

    async fn list_articles(&self, spec: &ArticleListSpec) -> Result<Vec<ArticleMeta>, DomainError> {
        self.count_read();
        Ok(self
            .matching_metas(spec)
            .into_iter()
            .skip(spec.offset.max(0) as usize)
            .take(spec.limit.max(0) as usize)
            .collect())
    }

    async fn count_articles(&self, spec: &ArticleListSpec) -> Result<i64, DomainError> {
        self.count_read();
        Ok(self.matching_metas(spec).len() as i64)
    }

    async fn article_detail(&self, id: Id, caller_id: Id) -> Result<ArticleRecord, DomainError> {
        self.count_read();
        self.lock()
            .articles
            .iter()
            .find(|a| a.meta.id == id && articles::visible_to(&a.meta, caller_id))
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    async fn insert_article(&self, article: &ArticleRecord) -> Result<(), DomainError> {
        self.lock().articles.push(article.clone());
        Ok(())
    }

    async fn tag_assigns_for(&self, res_ids: &[Id]) -> Result<Vec<TagAssignment>, DomainError> {
        self.count_read();
        let wanted: HashSet<Id> = res_ids.iter().copied().collect();
        Ok(self
            .lock()
            .assigns
            .iter()
            .filter(|a| wanted.contains(&a.res_id))
            .cloned()
            .collect())
    }

    async fn tags_by_ids(&self, ids: &[Id]) -> Result<Vec<Tag>, DomainError> {
        self.count_read();
        let inner = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.tags.iter().find(|tag| tag.id == *id).cloned())
            .collect())
    }

    async fn all_tags(&self) -> Result<Vec<Tag>, DomainError> {
        self.count_read();
        let mut tags = self.lock().tags.clone();
        tags.sort_by_key(|tag| tag.id);
        Ok(tags)
    }

    async fn tag_usage_counts(&self) -> Result<Vec<TagUsage>, DomainError> {
        self.count_read();
        let mut counts: HashMap<Id, i64> = HashMap::new();
        for assign in &self.lock().assigns {
            *counts.entry(assign.tag_id).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(tag_id, count)| TagUsage { tag_id, count })
            .collect())
    }
}

pub struct MemTx {
    store: MemStore,
}

impl StoreTx for MemTx {
    async fn article_owner(&mut self, id: Id) -> Result<Id, DomainError> {
        self.store
            .lock()
            .articles
            .iter()
            .find(|a| a.meta.id == id)
            .map(|a| a.meta.uid)
            .ok_or(DomainError::NotFound)
    }

    async fn article_modify_time(&mut self, id: Id) -> Result<DateTime<Utc>, DomainError> {
        self.store
            .lock()
            .articles
            .iter()
            .find(|a| a.meta.id == id)
            .map(|a| a.meta.modify_time)
            .ok_or(DomainError::NotFound)
    }

    async fn update_article(&mut self, id: Id, changes: &ArticleChanges) -> Result<(), DomainError> {
        let mut inner = self.store.lock();
        let article = inner
            .articles
            .iter_mut()
            .find(|a| a.meta.id == id)
            .ok_or(DomainError::NotFound)?;

        if let Some(title) = &changes.title {
            article.meta.title = title.clone();
        }
        if let Some(content) = &changes.content {
            article.content = content.clone();
        }
        if let Some(abstracts) = &changes.abstracts {
            article.meta.abstracts = abstracts.clone();
        }
        if let Some(kind) = changes.kind {
            article.meta.kind = kind;
        }
        if let Some(source) = changes.source {
            article.meta.source = source;
        }
        if let Some(status) = changes.status {
            article.meta.status = status;
        }
        if let Some(is_elite) = changes.is_elite {
            article.meta.is_elite = is_elite;
        }
        if let Some(is_top) = changes.is_top {
            article.meta.is_top = is_top;
        }
        article.meta.modify_time = changes.modify_time;
        Ok(())
    }

    async fn delete_article(&mut self, id: Id, owner: Option<Id>) -> Result<(), DomainError> {
        let mut inner = self.store.lock();
        let before = inner.articles.len();
        inner
            .articles
            .retain(|a| !(a.meta.id == id && owner.is_none_or(|uid| a.meta.uid == uid)));
        if inner.articles.len() == before {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn clear_tag_assigns(&mut self, res_id: Id) -> Result<(), DomainError> {
        self.store.lock().assigns.retain(|a| a.res_id != res_id);
        Ok(())
    }

    async fn find_tag_by_name(&mut self, name: &str) -> Result<Option<Tag>, DomainError> {
        Ok(self
            .store
            .lock()
            .tags
            .iter()
            .find(|tag| tag.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert_tag(&mut self, tag: &Tag) -> Result<(), DomainError> {
        self.store.lock().tags.push(tag.clone());
        Ok(())
    }

    async fn insert_tag_assign(&mut self, assign: &TagAssignment) -> Result<(), DomainError> {
        let mut inner = self.store.lock();
        let duplicate = inner.assigns.iter().any(|a| {
            a.res_id == assign.res_id && a.tag_id == assign.tag_id && a.res_type == assign.res_type
        });
        if duplicate {
            return Err(DomainError::Storage(
                "duplicate key value violates unique constraint \"uni_res_tag\"".to_owned(),
            ));
        }
        inner.assigns.push(assign.clone());
        Ok(())
    }

    async fn delete_tag_assign(&mut self, res_id: Id, tag_id: Id) -> Result<(), DomainError> {
        self.store
            .lock()
            .assigns
            .retain(|a| !(a.res_id == res_id && a.tag_id == tag_id));
        Ok(())
    }

    async fn commit(self) -> Result<(), DomainError> {
        Ok(())
    }
}
