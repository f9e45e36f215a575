// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Approval Workflow
//!
//! Two-tier approval of withdrawal requests:
//!
//! - **Tier one** (`admin` or `super_admin`): `admin_approve` re-validates
//!   the locked funds and advances `pending → admin_approved`.
//! - **Tier two** (`super_admin` only): `process` / `mark_sent_manual`
//!   dispatch the funds and settle `→ completed`, unlocking and deducting
//!   the sender and, for internal transfers, crediting the recipient.
//! - `reject` (`admin` or `super_admin`) refunds the locked funds.
//!
//! Internal transfers have no cross-account primitive: the debit and credit
//! legs are separate ledger calls tied together by the [`saga::Saga`]
//! runner, which reverts completed legs when a later one fails.

pub mod engine;
pub mod error;
pub mod rate_limit;
pub mod saga;


pub use engine::{Actor, Settlement, WithdrawalEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use rate_limit::{RateLimitConfig, RateLimiter};
