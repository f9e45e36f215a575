// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External payout providers.
//!
//! Automatic processing hands an external withdrawal to a [`PayoutProvider`]
//! and only settles the ledger once the provider confirms dispatch.

pub mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use http::HttpPayoutProvider;

/// What the provider is asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutInstruction {
    /// Withdrawal request id, also used as the idempotency key.
    pub request_id: String,
    pub to_address: String,
    pub network: Option<String>,
    pub coin_symbol: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

/// Provider confirmation of a dispatched payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub tx_hash: String,
    pub provider_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayoutError {
    #[error("payout provider not configured")]
    NotConfigured,

    #[error("payout request failed: {0}")]
    Request(String),

    #[error("payout rejected by provider: {0}")]
    Rejected(String),

    #[error("payout provider response was invalid: {0}")]
    InvalidResponse(String),

    #[error("payout provider timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait PayoutProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dispatch funds. Must be idempotent on `instruction.request_id`.
    async fn dispatch_payout(&self, instruction: &PayoutInstruction)
        -> Result<PayoutReceipt, PayoutError>;
}

/// Stand-in used when no provider is configured; every automatic payout
/// fails and the request stays where it was.
pub struct DisabledPayoutProvider;

#[async_trait]
impl PayoutProvider for DisabledPayoutProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn dispatch_payout(
        &self,
        _instruction: &PayoutInstruction,
    ) -> Result<PayoutReceipt, PayoutError> {
        Err(PayoutError::NotConfigured)
    }
}
