// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for balances, withdrawal requests, transactions and the
//! audit trail, in one embedded **redb** database at `DATA_DIR/custody.redb`.
//!
//! ## Storage Layout
//!
//! ```text
//! custody.redb
//!   balances              "{user_id}|{base_token_id}" -> BalanceRecord
//!   withdrawal_requests   "{request_id}"              -> WithdrawalRequest
//!   transactions          "{transaction_id}"          -> Transaction
//!   audit_events          "{rfc3339 ts}|{event_id}"   -> AuditEvent
//! ```
//!
//! Values are JSON. Every ledger primitive and every status check-and-set is
//! one write transaction; redb serializes writers, so read-modify-write
//! sequences cannot interleave.

pub mod audit;
pub mod database;

pub use audit::{AuditEvent, AuditEventType, AuditQuery, AuditSink, InMemoryAuditLog};
pub use database::{CustodyDatabase, DbError, DbResult};
