// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Ledger
//!
//! Per-(user, base token) custody balances. Every balance mutation in the
//! service goes through one of the four primitives on [`Ledger`]:
//!
//! | Primitive | Precondition | Effect |
//! |-----------|--------------|--------|
//! | `lock` | `available >= amount` | `locked_balance += amount` |
//! | `unlock(Deduct)` | `locked_balance >= amount` | `locked_balance -= amount`, `balance -= amount` |
//! | `unlock(Refund)` | `locked_balance >= amount` | `locked_balance -= amount` |
//! | `credit` | none | `balance += amount` |
//! | `debit` | `available >= amount` | `balance -= amount` |
//!
//! where `available = balance - locked_balance`.
//!
//! ## Invariant
//!
//! `0 <= locked_balance <= balance` holds for every record at all times.
//! The arithmetic lives on [`BalanceRecord`] so every backend enforces the
//! same rules; backends only provide the atomic read-modify-write around it.

pub mod memory;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use memory::{InMemoryLedger, LedgerOp};

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("insufficient available balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error("insufficient locked balance: locked {locked}, requested {requested}")]
    InsufficientLockedBalance { locked: Decimal, requested: Decimal },

    #[error("ledger storage error: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// What happens to the funds released by [`Ledger::unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMode {
    /// Funds leave the user's balance (payout or internal transfer).
    Deduct,
    /// Funds return to the user's available balance.
    Refund,
}

/// Custody balance of one user for one base token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BalanceRecord {
    pub user_id: String,
    /// Base token identifier (e.g. `USDT`), independent of network.
    pub base_token_id: String,
    #[schema(value_type = String)]
    pub balance: Decimal,
    #[schema(value_type = String)]
    pub locked_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl BalanceRecord {
    /// A zero balance, used when no record exists yet.
    pub fn empty(user_id: &str, base_token_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            base_token_id: base_token_id.to_string(),
            balance: Decimal::ZERO,
            locked_balance: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Balance not reserved by pending withdrawals.
    pub fn available(&self) -> Decimal {
        self.balance - self.locked_balance
    }

    /// Whether `0 <= locked_balance <= balance` holds.
    pub fn is_consistent(&self) -> bool {
        self.locked_balance >= Decimal::ZERO && self.locked_balance <= self.balance
    }

    pub fn apply_lock(&mut self, amount: Decimal) -> LedgerResult<()> {
        ensure_positive(amount)?;
        if self.available() < amount {
            return Err(LedgerError::InsufficientBalance {
                available: self.available(),
                requested: amount,
            });
        }
        self.locked_balance += amount;
        Ok(())
    }

    pub fn apply_unlock(&mut self, amount: Decimal, mode: UnlockMode) -> LedgerResult<()> {
        ensure_positive(amount)?;
        if self.locked_balance < amount {
            return Err(LedgerError::InsufficientLockedBalance {
                locked: self.locked_balance,
                requested: amount,
            });
        }
        self.locked_balance -= amount;
        if mode == UnlockMode::Deduct {
            self.balance -= amount;
        }
        Ok(())
    }

    pub fn apply_credit(&mut self, amount: Decimal) -> LedgerResult<()> {
        ensure_positive(amount)?;
        self.balance += amount;
        Ok(())
    }

    /// Debits never dip into locked funds, otherwise a compensation could
    /// leave `locked_balance > balance`.
    pub fn apply_debit(&mut self, amount: Decimal) -> LedgerResult<()> {
        ensure_positive(amount)?;
        if self.available() < amount {
            return Err(LedgerError::InsufficientBalance {
                available: self.available(),
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

fn ensure_positive(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        Err(LedgerError::InvalidAmount(amount))
    } else {
        Ok(())
    }
}

/// Atomic balance primitives.
///
/// Each call is applied as a single atomic unit: concurrent callers on the
/// same `(user, token)` record are serialized, and a failed precondition
/// leaves the record untouched. Implementations return the record as it
/// stands after the call.
pub trait Ledger: Send + Sync {
    /// Reserve `amount` of the available balance.
    fn lock(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord>;

    /// Release `amount` of locked funds, deducting or refunding them.
    fn unlock(
        &self,
        user_id: &str,
        token: &str,
        amount: Decimal,
        mode: UnlockMode,
    ) -> LedgerResult<BalanceRecord>;

    /// Unconditionally increase the balance.
    fn credit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord>;

    /// Decrease the balance. Only used by rollback compensation.
    fn debit(&self, user_id: &str, token: &str, amount: Decimal) -> LedgerResult<BalanceRecord>;

    /// Read the current record (zero if none exists).
    fn get_balance(&self, user_id: &str, token: &str) -> LedgerResult<BalanceRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(balance: Decimal, locked: Decimal) -> BalanceRecord {
        let mut r = BalanceRecord::empty("user_1", "USDT");
        r.balance = balance;
        r.locked_balance = locked;
        r
    }

    #[test]
    fn lock_requires_available_funds() {
        let mut r = record(dec!(100), dec!(70));
        assert_eq!(
            r.apply_lock(dec!(40)),
            Err(LedgerError::InsufficientBalance {
                available: dec!(30),
                requested: dec!(40)
            })
        );
        r.apply_lock(dec!(30)).unwrap();
        assert_eq!(r.locked_balance, dec!(100));
        assert!(r.is_consistent());
    }

    #[test]
    fn unlock_deduct_removes_funds() {
        let mut r = record(dec!(100), dec!(40));
        r.apply_unlock(dec!(40), UnlockMode::Deduct).unwrap();
        assert_eq!(r.balance, dec!(60));
        assert_eq!(r.locked_balance, dec!(0));
    }

    #[test]
    fn unlock_refund_keeps_balance() {
        let mut r = record(dec!(100), dec!(40));
        r.apply_unlock(dec!(40), UnlockMode::Refund).unwrap();
        assert_eq!(r.balance, dec!(100));
        assert_eq!(r.available(), dec!(100));
    }

    #[test]
    fn unlock_more_than_locked_fails_without_mutation() {
        let mut r = record(dec!(100), dec!(10));
        let err = r.apply_unlock(dec!(40), UnlockMode::Deduct).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLockedBalance { .. }));
        assert_eq!(r, record(dec!(100), dec!(10)).with_time(r.updated_at));
    }

    #[test]
    fn debit_cannot_touch_locked_funds() {
        let mut r = record(dec!(100), dec!(80));
        assert!(r.apply_debit(dec!(30)).is_err());
        r.apply_debit(dec!(20)).unwrap();
        assert_eq!(r.balance, dec!(80));
        assert!(r.is_consistent());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut r = record(dec!(100), dec!(0));
        assert_eq!(r.apply_credit(dec!(0)), Err(LedgerError::InvalidAmount(dec!(0))));
        assert_eq!(r.apply_lock(dec!(-1)), Err(LedgerError::InvalidAmount(dec!(-1))));
    }

    impl BalanceRecord {
        fn with_time(mut self, at: DateTime<Utc>) -> Self {
            self.updated_at = at;
            self
        }
    }
}
