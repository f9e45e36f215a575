// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody Server - Withdrawal Approval & Balance Custody Service
//!
//! Users' withdrawal requests lock funds in a custody ledger and then pass a
//! two-tier review: an admin approves, a super-admin processes (payout
//! provider or manual send), and either tier may reject and refund.
//! Internal transfers between platform users settle by ledger credit with
//! compensating rollback.
//!
//! ## Modules
//!
//! - `ledger` - Per-(user, token) balances and the lock/unlock/credit/debit primitives
//! - `withdrawal` - Request and transaction records, status machine, store
//! - `workflow` - Approval engine, settlement saga, rate limiter
//! - `providers` - Payout provider seam
//! - `storage` - redb database and audit trail
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer-token authentication and roles

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod notifications;
pub mod providers;
pub mod state;
pub mod storage;
pub mod withdrawal;
pub mod workflow;
