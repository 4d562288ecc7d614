//! Per-account write serialisation for stock and balance checks
//!
//! Availability and overpayment checks read state and then write in a
//! separate statement. Callers hold an [`AccountGuard`] across both so that
//! two requests for the same account cannot pass the same check.

use crate::domain::types::UserId;
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use crate::storage::PgTx;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

/// Namespace of the advisory locks taken here, first key of the two-key form
const ACCOUNT_LOCK_NAMESPACE: i32 = 0x5245_4e54;

#[async_trait]
pub trait AccountLock: Send + Sync {
    /// Wait until no other writer holds `user_id`
    async fn lock_account(&self, user_id: &UserId) -> Result<AccountGuard>;
}

/// Held while a check and its write run; released with [`AccountGuard::release`]
pub struct AccountGuard {
    inner: GuardInner,
}

enum GuardInner {
    /// Transaction holding `pg_advisory_xact_lock`; ending it frees the lock
    Postgres(PgTx<'static>),
    Local(OwnedMutexGuard<()>),
}

impl AccountGuard {
    pub async fn release(self) -> Result<()> {
        match self.inner {
            GuardInner::Postgres(tx) => tx
                .commit()
                .await
                .map_err(|e| InventoryError::database("release_account_lock", e)),
            GuardInner::Local(guard) => {
                drop(guard);
                Ok(())
            }
        }
    }
}

/// Advisory lock keyed by the account, shared by every API instance on the database
pub struct PgAccountLock {
    db: Database,
}

impl PgAccountLock {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountLock for PgAccountLock {
    async fn lock_account(&self, user_id: &UserId) -> Result<AccountGuard> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
            .bind(ACCOUNT_LOCK_NAMESPACE)
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::database("lock_account", e))?;

        Ok(AccountGuard {
            inner: GuardInner::Postgres(tx),
        })
    }
}

/// One async mutex per account, for the in-process store
#[derive(Default)]
pub struct LocalAccountLock {
    accounts: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl LocalAccountLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountLock for LocalAccountLock {
    async fn lock_account(&self, user_id: &UserId) -> Result<AccountGuard> {
        let mutex = {
            let mut accounts = match self.accounts.lock() {
                Ok(accounts) => accounts,
                Err(poisoned) => {
                    warn!("Account lock table was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            accounts.entry(user_id.clone()).or_default().clone()
        };

        Ok(AccountGuard {
            inner: GuardInner::Local(mutex.lock_owned().await),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_account_waits_for_release() {
        let locks = Arc::new(LocalAccountLock::new());
        let user = UserId::new("user-1");

        let guard = locks.lock_account(&user).await.unwrap();

        let contender = {
            let locks = locks.clone();
            let user = user.clone();
            tokio::spawn(async move { locks.lock_account(&user).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        guard.release().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_accounts_lock_independently() {
        let locks = LocalAccountLock::new();
        let _first = locks.lock_account(&UserId::new("user-1")).await.unwrap();

        let second = tokio::time::timeout(
            Duration::from_secs(1),
            locks.lock_account(&UserId::new("user-2")),
        )
        .await;
        assert!(second.is_ok());
    }
}
