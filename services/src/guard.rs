//! Shared mutation guards.
//!
//! Both run inside the caller's open transaction so the row they inspect is
//! the row the mutation will touch.

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::session::Session;
use crate::store::{Id, StoreTx};

/// Admins pass without a lookup. Everyone else must own the article; a
/// missing article surfaces as [`DomainError::NotFound`] from the lookup.
pub async fn check_perm<T: StoreTx>(
    tx: &mut T,
    id: Id,
    session: &Session,
) -> Result<(), DomainError> {
    if session.is_admin() {
        return Ok(());
    }
    let owner = tx.article_owner(id).await?;
    if owner != session.identity.id {
        return Err(DomainError::Forbidden);
    }
    Ok(())
}

/// Optimistic-concurrency check. A caller that supplies no baseline opts
/// out; otherwise the stored row must not be newer than what the caller
/// last saw.
pub async fn check_modify_behind<T: StoreTx>(
    tx: &mut T,
    id: Id,
    baseline: Option<DateTime<Utc>>,
) -> Result<(), DomainError> {
    let Some(baseline) = baseline else {
        return Ok(());
    };
    let stored = tx.article_modify_time(id).await?;
    if stored > baseline {
        tracing::warn!(article_id = id, %stored, %baseline, "update baseline is stale");
        return Err(DomainError::ModifyBehind);
    }
    Ok(())
}
