// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger used by tests and local development.
//!
//! A single mutex guards the whole balance map, so every primitive is one
//! read-modify-write with no interleaving. Failures can be injected per
//! operation and user to exercise the rollback paths of the workflow engine.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;

use super::{BalanceRecord, Ledger, LedgerError, LedgerResult, UnlockMode};

/// Ledger primitive, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Lock,
    Unlock,
    Credit,
    Debit,
}

type BalanceKey = (String, String);

#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<BalanceKey, BalanceRecord>>,
    injected_failures: Mutex<Vec<(LedgerOp, String)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly. Test setup only; bypasses the primitives.
    pub fn set_balance(&self, user_id: &str, token: &str, balance: Decimal, locked: Decimal) {
        let mut record = BalanceRecord::empty(user_id, token);
        record.balance = balance;
        record.locked_balance = locked;
        self.records()
            .insert((user_id.to_string(), token.to_string()), record);
    }

    /// Make the next `op` against `user_id` fail with a storage error.
    pub fn fail_next(&self, op: LedgerOp, user_id: &str) {
        self.injected_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((op, user_id.to_string()));
    }

    /// Snapshot of every record, for invariant checks.
    pub fn all_records(&self) -> Vec<BalanceRecord> {
        self.records().values().cloned().collect()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<BalanceKey, BalanceRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_injected_failure(&self, op: LedgerOp, user_id: &str) -> LedgerResult<()> {
        let mut failures = self
            .injected_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pos) = failures
            .iter()
            .position(|(o, u)| *o == op && u == user_id)
        {
            failures.remove(pos);
            return Err(LedgerError::Storage(format!(
                "injected {op:?} failure for {user_id}"
            )));
        }
        Ok(())
    }

    fn apply(
        &self,
        op: LedgerOp,
        user_id: &str,
        token: &str,
        mutate: impl FnOnce(&mut BalanceRecord) -> LedgerResult<()>,
    ) -> LedgerResult<BalanceRecord> {
        self.take_injected_failure(op, user_id)?;

        let mut records = self.records();
        let key = (user_id.to_string(), token.to_string());
        let mut record = records
            .get(&key)
            .cloned()
            .unwrap_or_else(|| BalanceRecord::empty(user_id, token));

        mutate(&mut record)?;
        record.updated_at = Utc::now();
        records.insert(key, record.clone());
        Ok(record)
    }
}

impl Ledger for InMemoryLedger {
    fn lock(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply(LedgerOp::Lock, user_id, token, |r| r.apply_lock(amount))
    }

    fn unlock(
        &self,
        user_id: &str,
        token: &str,
        amount: Decimal,
        mode: UnlockMode,
    ) -> LedgerResult<BalanceRecord> {
        self.apply(LedgerOp::Unlock, user_id, token, |r| {
            r.apply_unlock(amount, mode)
        })
    }

    fn credit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply(LedgerOp::Credit, user_id, token, |r| r.apply_credit(amount))
    }

    fn debit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord> {
        self.apply(LedgerOp::Debit, user_id, token, |r| r.apply_debit(amount))
    }

    fn get_balance(&self, user_id: &str, token: &str) -> LedgerResult<BalanceRecord> {
        Ok(self
            .records()
            .get(&(user_id.to_string(), token.to_string()))
            .cloned()
            .unwrap_or_else(|| BalanceRecord::empty(user_id, token)))
    }
}
