// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence seam for withdrawal requests and their transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Transaction, WithdrawalRequest, WithdrawalStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The stored status moved since the caller read it.
    #[error("status conflict: request is now {actual}")]
    StatusConflict { actual: WithdrawalStatus },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait WithdrawalStore: Send + Sync {
    /// Insert a new request together with its linked transaction.
    fn insert(&self, request: &WithdrawalRequest, transaction: &Transaction) -> StoreResult<()>;

    fn get(&self, id: &str) -> StoreResult<Option<WithdrawalRequest>>;

    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>>;

    /// All requests, optionally filtered by status, oldest first.
    fn list(&self, status: Option<WithdrawalStatus>) -> StoreResult<Vec<WithdrawalRequest>>;

    /// Write `request` and `transaction` in one atomic unit iff the stored
    /// request still has `expected` status.
    fn compare_and_swap(
        &self,
        expected: WithdrawalStatus,
        request: &WithdrawalRequest,
        transaction: &Transaction,
    ) -> StoreResult<()>;

    /// Insert a standalone transaction (synthesized deposits).
    fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;

    fn transactions_for_user(&self, user_id: &str) -> StoreResult<Vec<Transaction>>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
struct Tables {
    requests: HashMap<String, WithdrawalRequest>,
    transactions: HashMap<String, Transaction>,
}

/// Mutex-guarded store for tests and local runs.
#[derive(Default)]
pub struct InMemoryWithdrawalStore {
    tables: Mutex<Tables>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WithdrawalStore for InMemoryWithdrawalStore {
    fn insert(&self, request: &WithdrawalRequest, transaction: &Transaction) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.requests.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists(request.id.clone()));
        }
        if tables.transactions.contains_key(&transaction.id) {
            return Err(StoreError::AlreadyExists(transaction.id.clone()));
        }
        tables.requests.insert(request.id.clone(), request.clone());
        tables
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<WithdrawalRequest>> {
        Ok(self.tables().requests.get(id).cloned())
    }

    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self.tables().transactions.get(id).cloned())
    }

    fn list(&self, status: Option<WithdrawalStatus>) -> StoreResult<Vec<WithdrawalRequest>> {
        let mut requests: Vec<_> = self
            .tables()
            .requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }

    fn compare_and_swap(
        &self,
        expected: WithdrawalStatus,
        request: &WithdrawalRequest,
        transaction: &Transaction,
    ) -> StoreResult<()> {
        let mut tables = self.tables();
        let current = tables
            .requests
            .get(&request.id)
            .ok_or_else(|| StoreError::NotFound(request.id.clone()))?;
        if current.status != expected {
            return Err(StoreError::StatusConflict {
                actual: current.status,
            });
        }
        tables.requests.insert(request.id.clone(), request.clone());
        tables
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.transactions.contains_key(&transaction.id) {
            return Err(StoreError::AlreadyExists(transaction.id.clone()));
        }
        tables
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    fn transactions_for_user(&self, user_id: &str) -> StoreResult<Vec<Transaction>> {
        let mut txs: Vec<_> = self
            .tables()
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn seeded() -> (InMemoryWithdrawalStore, WithdrawalRequest, Transaction) {
        let store = InMemoryWithdrawalStore::new();
        let request = WithdrawalRequest::new_external("u1", dec!(10), "USDT", "USDT", None, "0xabc", None);
        let tx = Transaction::for_withdrawal(&request);
        store.insert(&request, &tx).unwrap();
        (store, request, tx)
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (store, request, tx) = seeded();
        assert_eq!(
            store.insert(&request, &tx),
            Err(StoreError::AlreadyExists(request.id.clone()))
        );
    }

    #[test]
    fn compare_and_swap_detects_moved_status() {
        let (store, request, tx) = seeded();

        let mut approved = request.clone();
        approved.admin_approve("admin", Utc::now()).unwrap();
        store
            .compare_and_swap(WithdrawalStatus::Pending, &approved, &tx)
            .unwrap();

        let mut rejected = request.clone();
        rejected.reject("late", Utc::now()).unwrap();
        assert_eq!(
            store.compare_and_swap(WithdrawalStatus::Pending, &rejected, &tx),
            Err(StoreError::StatusConflict {
                actual: WithdrawalStatus::AdminApproved
            })
        );
        assert_eq!(
            store.get(&request.id).unwrap().unwrap().status,
            WithdrawalStatus::AdminApproved
        );
    }

    #[test]
    fn list_filters_by_status() {
        let (store, _, _) = seeded();
        let mut other = WithdrawalRequest::new_internal("u2", "u3", dec!(5), "USDT", "USDT");
        other.reject("spam", Utc::now()).unwrap();
        store.insert(&other, &Transaction::for_withdrawal(&other)).unwrap();

        assert_eq!(store.list(None).unwrap().len(), 2);
        let rejected = store.list(Some(WithdrawalStatus::Rejected)).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, other.id);
    }

    #[test]
    fn transactions_for_user_only_returns_owned() {
        let (store, _, tx) = seeded();
        assert_eq!(store.transactions_for_user("u1").unwrap(), vec![tx]);
        assert!(store.transactions_for_user("u2").unwrap().is_empty());
    }
}
