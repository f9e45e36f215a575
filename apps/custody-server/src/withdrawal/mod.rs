// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal requests, their linked transactions, and persistence.

pub mod intake;
pub mod model;
pub mod store;
pub mod transaction;

pub use model::{
    Destination, InvalidDestination, InvalidTransition, ProcessingType, WithdrawalRequest,
    WithdrawalStatus,
};
pub use store::{InMemoryWithdrawalStore, StoreError, StoreResult, WithdrawalStore};
pub use transaction::{
    rejection_note, Transaction, TransactionKind, TransactionMetadata, TransactionStatus,
};
