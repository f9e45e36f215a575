// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded custody database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `balances`: `user_id|base_token_id` → serialized [`BalanceRecord`]
//! - `withdrawal_requests`: request id → serialized [`WithdrawalRequest`]
//! - `transactions`: transaction id → serialized [`Transaction`]
//! - `audit_events`: `rfc3339_nanos|event_id` → serialized [`AuditEvent`]
//!
//! redb serializes write transactions, so each ledger primitive and each
//! check-and-set is a single atomic read-modify-write.

use std::path::Path;

use chrono::SecondsFormat;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::ledger::{BalanceRecord, Ledger, LedgerError, LedgerResult, UnlockMode};
use crate::withdrawal::{StoreError, StoreResult, Transaction, WithdrawalRequest, WithdrawalStatus, WithdrawalStore};

use super::audit::{AuditError, AuditEvent, AuditQuery, AuditSink};

// =============================================================================
// Table Definitions
// =============================================================================

const BALANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("balances");

const WITHDRAWALS: TableDefinition<&str, &[u8]> = TableDefinition::new("withdrawal_requests");

const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Key format sorts chronologically: fixed-width UTC timestamp, then id.
const AUDIT_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for LedgerError {
    fn from(e: DbError) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl From<DbError> for AuditError {
    fn from(e: DbError) -> Self {
        AuditError(e.to_string())
    }
}

fn balance_key(user_id: &str, token: &str) -> String {
    format!("{user_id}|{token}")
}

fn audit_key(event: &AuditEvent) -> String {
    format!(
        "{}|{}",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        event.event_id
    )
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// CustodyDatabase
// =============================================================================

pub struct CustodyDatabase {
    db: Database,
}

impl CustodyDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BALANCES)?;
            let _ = write_txn.open_table(WITHDRAWALS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Write a balance record as-is. Used for seeding and operator tooling.
    pub fn put_balance(&self, record: &BalanceRecord) -> DbResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(BALANCES)?;
            table.insert(
                balance_key(&record.user_id, &record.base_token_id).as_str(),
                json.as_slice(),
            )?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn read_balance(&self, user_id: &str, token: &str) -> DbResult<BalanceRecord> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BALANCES)?;
        match table.get(balance_key(user_id, token).as_str())? {
            Some(value) => decode(value.value()),
            None => Ok(BalanceRecord::empty(user_id, token)),
        }
    }

    /// One write transaction around `mutate`. A rejected mutation drops the
    /// transaction uncommitted, leaving the record untouched.
    fn apply_balance(
        &self,
        user_id: &str,
        token: &str,
        mutate: impl FnOnce(&mut BalanceRecord) -> LedgerResult<()>,
    ) -> DbResult<LedgerResult<BalanceRecord>> {
        let key = balance_key(user_id, token);
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(BALANCES)?;
            let existing = match table.get(key.as_str())? {
                Some(value) => Some(decode::<BalanceRecord>(value.value())?),
                None => None,
            };
            let mut record = existing.unwrap_or_else(|| BalanceRecord::empty(user_id, token));
            if let Err(e) = mutate(&mut record) {
                return Ok(Err(e));
            }
            record.updated_at = chrono::Utc::now();
            let json = serde_json::to_vec(&record)?;
            table.insert(key.as_str(), json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(Ok(record))
    }

    // =========================================================================
    // Withdrawal requests and transactions
    // =========================================================================

    fn get_request(&self, id: &str) -> DbResult<Option<WithdrawalRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WITHDRAWALS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn get_tx(&self, id: &str) -> DbResult<Option<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn scan_requests(&self) -> DbResult<Vec<WithdrawalRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WITHDRAWALS)?;
        let mut requests = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            requests.push(decode::<WithdrawalRequest>(value.value())?);
        }
        Ok(requests)
    }

    fn scan_transactions(&self) -> DbResult<Vec<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        let mut txs = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            txs.push(decode::<Transaction>(value.value())?);
        }
        Ok(txs)
    }

    fn insert_request(
        &self,
        request: &WithdrawalRequest,
        transaction: &Transaction,
    ) -> DbResult<StoreResult<()>> {
        let req_json = serde_json::to_vec(request)?;
        let tx_json = serde_json::to_vec(transaction)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut requests = write_txn.open_table(WITHDRAWALS)?;
            if requests.get(request.id.as_str())?.is_some() {
                return Ok(Err(StoreError::AlreadyExists(request.id.clone())));
            }
            let mut txs = write_txn.open_table(TRANSACTIONS)?;
            if txs.get(transaction.id.as_str())?.is_some() {
                return Ok(Err(StoreError::AlreadyExists(transaction.id.clone())));
            }
            requests.insert(request.id.as_str(), req_json.as_slice())?;
            txs.insert(transaction.id.as_str(), tx_json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(Ok(()))
    }

    fn swap_request(
        &self,
        expected: WithdrawalStatus,
        request: &WithdrawalRequest,
        transaction: &Transaction,
    ) -> DbResult<StoreResult<()>> {
        let req_json = serde_json::to_vec(request)?;
        let tx_json = serde_json::to_vec(transaction)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut requests = write_txn.open_table(WITHDRAWALS)?;
            let current = match requests.get(request.id.as_str())? {
                Some(value) => decode::<WithdrawalRequest>(value.value())?,
                None => return Ok(Err(StoreError::NotFound(request.id.clone()))),
            };
            if current.status != expected {
                return Ok(Err(StoreError::StatusConflict {
                    actual: current.status,
                }));
            }
            requests.insert(request.id.as_str(), req_json.as_slice())?;
            let mut txs = write_txn.open_table(TRANSACTIONS)?;
            txs.insert(transaction.id.as_str(), tx_json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(Ok(()))
    }

    fn put_new_transaction(&self, transaction: &Transaction) -> DbResult<StoreResult<()>> {
        let json = serde_json::to_vec(transaction)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut txs = write_txn.open_table(TRANSACTIONS)?;
            if txs.get(transaction.id.as_str())?.is_some() {
                return Ok(Err(StoreError::AlreadyExists(transaction.id.clone())));
            }
            txs.insert(transaction.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(Ok(()))
    }

    // =========================================================================
    // Audit events
    // =========================================================================

    fn append_audit(&self, event: &AuditEvent) -> DbResult<()> {
        let json = serde_json::to_vec(event)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(audit_key(event).as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn scan_audit(&self, query: &AuditQuery) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let start_key = query
            .start
            .map(|s| s.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .unwrap_or_default();

        let mut events = Vec::new();
        for entry in table.range(start_key.as_str()..)? {
            let (_, value) = entry?;
            let event: AuditEvent = decode(value.value())?;
            if query.end.is_some_and(|end| event.timestamp > end) {
                break;
            }
            events.push(event);
        }
        Ok(query.apply(events))
    }
}

impl Ledger for CustodyDatabase {
    fn lock(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply_balance(user_id, token, |r| r.apply_lock(amount))?
    }

    fn unlock(
        &self,
        user_id: &str,
        token: &str,
        amount: Decimal,
        mode: UnlockMode,
    ) -> LedgerResult<BalanceRecord> {
        self.apply_balance(user_id, token, |r| r.apply_unlock(amount, mode))?
    }

    fn credit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply_balance(user_id, token, |r| r.apply_credit(amount))?
    }

    fn debit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply_balance(user_id, token, |r| r.apply_debit(amount))?
    }

    fn get_balance(&self, user_id: &str, token: &str) -> LedgerResult<BalanceRecord> {
        Ok(self.read_balance(user_id, token)?)
    }
}

impl WithdrawalStore for CustodyDatabase {
    fn insert(&self, request: &WithdrawalRequest, transaction: &Transaction) -> StoreResult<()> {
        self.insert_request(request, transaction)?
    }

    fn get(&self, id: &str) -> StoreResult<Option<WithdrawalRequest>> {
        Ok(self.get_request(id)?)
    }

    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self.get_tx(id)?)
    }

    fn list(&self, status: Option<WithdrawalStatus>) -> StoreResult<Vec<WithdrawalRequest>> {
        let mut requests: Vec<_> = self
            .scan_requests()?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
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
        self.swap_request(expected, request, transaction)?
    }

    fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        self.put_new_transaction(transaction)?
    }

    fn transactions_for_user(&self, user_id: &str) -> StoreResult<Vec<Transaction>> {
        let mut txs: Vec<_> = self
            .scan_transactions()?
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect();
        txs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(txs)
    }
}

impl AuditSink for CustodyDatabase {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        Ok(self.append_audit(event)?)
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(self.scan_audit(query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::audit::AuditEventType;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CustodyDatabase) {
        let temp = TempDir::new().unwrap();
        let db = CustodyDatabase::open(&temp.path().join("custody.redb")).unwrap();
        (temp, db)
    }

    fn seed(db: &CustodyDatabase, user: &str, balance: Decimal, locked: Decimal) {
        let mut record = BalanceRecord::empty(user, "USDT");
        record.balance = balance;
        record.locked_balance = locked;
        db.put_balance(&record).unwrap();
    }

    #[test]
    fn ledger_primitives_persist() {
        let (_temp, db) = setup();
        seed(&db, "u1", dec!(100), dec!(0));

        db.lock("u1", "USDT", dec!(40)).unwrap();
        let after = db.unlock("u1", "USDT", dec!(40), UnlockMode::Deduct).unwrap();
        assert_eq!(after.balance, dec!(60));
        assert_eq!(after.locked_balance, dec!(0));

        let read = db.get_balance("u1", "USDT").unwrap();
        assert_eq!(read.balance, dec!(60));
    }

    #[test]
    fn rejected_mutation_is_not_committed() {
        let (_temp, db) = setup();
        seed(&db, "u1", dec!(100), dec!(10));

        let err = db.unlock("u1", "USDT", dec!(40), UnlockMode::Deduct).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLockedBalance { .. }));

        let read = db.get_balance("u1", "USDT").unwrap();
        assert_eq!(read.balance, dec!(100));
        assert_eq!(read.locked_balance, dec!(10));
    }

    #[test]
    fn credit_creates_missing_record() {
        let (_temp, db) = setup();
        assert_eq!(db.get_balance("u2", "USDT").unwrap().balance, dec!(0));
        db.credit("u2", "USDT", dec!(5)).unwrap();
        assert_eq!(db.get_balance("u2", "USDT").unwrap().balance, dec!(5));
    }

    #[test]
    fn compare_and_swap_is_conditional() {
        let (_temp, db) = setup();
        let request = WithdrawalRequest::new_external("u1", dec!(10), "USDT", "USDT", None, "0xabc", None);
        let tx = Transaction::for_withdrawal(&request);
        db.insert(&request, &tx).unwrap();

        let mut approved = request.clone();
        approved.admin_approve("admin", Utc::now()).unwrap();
        db.compare_and_swap(WithdrawalStatus::Pending, &approved, &tx)
            .unwrap();

        assert_eq!(
            db.compare_and_swap(WithdrawalStatus::Pending, &approved, &tx),
            Err(StoreError::StatusConflict {
                actual: WithdrawalStatus::AdminApproved
            })
        );
        assert_eq!(
            db.get(&request.id).unwrap().unwrap().admin_approved_by.as_deref(),
            Some("admin")
        );
    }

    #[test]
    fn compare_and_swap_on_unknown_request_fails() {
        let (_temp, db) = setup();
        let request = WithdrawalRequest::new_external("u1", dec!(10), "USDT", "USDT", None, "0xabc", None);
        let tx = Transaction::for_withdrawal(&request);
        assert!(matches!(
            db.compare_and_swap(WithdrawalStatus::Pending, &request, &tx),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_and_user_transactions() {
        let (_temp, db) = setup();
        let a = WithdrawalRequest::new_external("u1", dec!(1), "USDT", "USDT", None, "0xabc", None);
        let b = WithdrawalRequest::new_internal("u2", "u1", dec!(2), "USDT", "USDT");
        db.insert(&a, &Transaction::for_withdrawal(&a)).unwrap();
        db.insert(&b, &Transaction::for_withdrawal(&b)).unwrap();

        assert_eq!(db.list(None).unwrap().len(), 2);
        assert_eq!(db.list(Some(WithdrawalStatus::Completed)).unwrap().len(), 0);
        assert_eq!(db.transactions_for_user("u2").unwrap().len(), 1);
    }

    #[test]
    fn data_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custody.redb");
        {
            let db = CustodyDatabase::open(&path).unwrap();
            db.credit("u1", "USDT", dec!(7)).unwrap();
        }
        let db = CustodyDatabase::open(&path).unwrap();
        assert_eq!(db.get_balance("u1", "USDT").unwrap().balance, dec!(7));
    }

    #[test]
    fn audit_events_query_by_window() {
        let (_temp, db) = setup();
        let mut old = AuditEvent::new(AuditEventType::WithdrawalRejected).with_user("a1");
        old.timestamp = Utc::now() - Duration::days(2);
        db.record(&old).unwrap();
        db.record(&AuditEvent::new(AuditEventType::WithdrawalProcessed).with_user("a2"))
            .unwrap();

        let all = db.query(&AuditQuery::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_id, old.event_id);

        let recent = db
            .query(&AuditQuery {
                start: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_id.as_deref(), Some("a2"));

        let older = db
            .query(&AuditQuery {
                end: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(older.len(), 1);
    }
}
