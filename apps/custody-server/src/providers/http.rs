// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generic JSON-over-HTTP payout provider.
//!
//! `POST {PAYOUT_API_URL}/payouts`, authenticated by an `x-api-key` header
//! carrying `PAYOUT_API_KEY`, with an `Idempotency-Key` header equal to the
//! withdrawal request id. A successful response carries the on-chain hash
//! either at the top level or under `payout`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::info;

use super::{PayoutError, PayoutInstruction, PayoutProvider, PayoutReceipt};
use crate::config::{PAYOUT_API_KEY_ENV, PAYOUT_API_URL_ENV};

const API_KEY_HEADER: &str = "x-api-key";
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct HttpPayoutProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl HttpPayoutProvider {
    pub fn is_configured() -> bool {
        required_env_present(PAYOUT_API_URL_ENV) && required_env_present(PAYOUT_API_KEY_ENV)
    }

    pub fn from_env(timeout: Duration) -> Result<Self, PayoutError> {
        let base_url = env_required(PAYOUT_API_URL_ENV)?;
        let api_key = env_required(PAYOUT_API_KEY_ENV)?;
        Self::new(base_url, api_key, timeout)
    }

    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, PayoutError> {
        url::Url::parse(&base_url)
            .map_err(|e| PayoutError::Request(format!("invalid payout base URL: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PayoutError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            api_key,
            http,
        })
    }

    fn payout_request(&self, instruction: &PayoutInstruction) -> RequestBuilder {
        let url = format!("{}/payouts", self.base_url.trim_end_matches('/'));
        self.http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(IDEMPOTENCY_KEY_HEADER, &instruction.request_id)
            .json(&build_payout_payload(instruction))
    }
}

#[async_trait]
impl PayoutProvider for HttpPayoutProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn dispatch_payout(
        &self,
        instruction: &PayoutInstruction,
    ) -> Result<PayoutReceipt, PayoutError> {
        let response = self
            .payout_request(instruction)
            .send()
            .await
            .map_err(|e| PayoutError::Request(format!("POST /payouts failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(PayoutError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PayoutError::Request(format!(
                "POST /payouts returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PayoutError::InvalidResponse(format!("invalid JSON: {e}")))?;
        let receipt = interpret_response(&body)?;

        info!(
            request_id = %instruction.request_id,
            tx_hash = %receipt.tx_hash,
            "Payout dispatched"
        );
        Ok(receipt)
    }
}

fn build_payout_payload(instruction: &PayoutInstruction) -> Value {
    json!({
        "reference": instruction.request_id,
        "destination": {
            "address": instruction.to_address,
            "network": instruction.network,
            "memo": instruction.memo,
        },
        "currency": instruction.coin_symbol,
        "amount": instruction.amount.to_string(),
    })
}

fn payout_field<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .or_else(|| body.get("payout").and_then(|p| p.get(field)))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Turn a 2xx provider body into a receipt. A `failed`/`rejected` status
/// or a missing hash is not a confirmed dispatch.
fn interpret_response(body: &Value) -> Result<PayoutReceipt, PayoutError> {
    if let Some(status) = payout_field(body, "status") {
        let status = status.to_ascii_lowercase();
        if matches!(status.as_str(), "failed" | "rejected" | "cancelled") {
            let reason = payout_field(body, "failure_reason").unwrap_or("no reason given");
            return Err(PayoutError::Rejected(format!("{status}: {reason}")));
        }
    }
    let tx_hash = payout_field(body, "tx_hash")
        .ok_or_else(|| PayoutError::InvalidResponse("response did not include tx_hash".into()))?;
    Ok(PayoutReceipt {
        tx_hash: tx_hash.to_string(),
        provider_reference: payout_field(body, "id").map(str::to_string),
    })
}

fn required_env_present(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn env_required(key: &str) -> Result<String, PayoutError> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(PayoutError::NotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn interpret_response_reads_top_level_hash() {
        let receipt = interpret_response(&json!({ "id": "po_1", "tx_hash": "0xabc" })).unwrap();
        assert_eq!(receipt.tx_hash, "0xabc");
        assert_eq!(receipt.provider_reference.as_deref(), Some("po_1"));
    }

    #[test]
    fn interpret_response_reads_nested_payout() {
        let body = json!({ "payout": { "tx_hash": "0xdef", "status": "submitted" } });
        assert_eq!(interpret_response(&body).unwrap().tx_hash, "0xdef");
    }

    #[test]
    fn interpret_response_rejects_failed_status() {
        let body = json!({ "status": "failed", "failure_reason": "insufficient hot wallet" });
        assert!(matches!(
            interpret_response(&body),
            Err(PayoutError::Rejected(msg)) if msg.contains("insufficient hot wallet")
        ));
    }

    #[test]
    fn interpret_response_requires_hash() {
        assert!(matches!(
            interpret_response(&json!({ "id": "po_1", "tx_hash": "  " })),
            Err(PayoutError::InvalidResponse(_))
        ));
    }

    fn instruction() -> PayoutInstruction {
        PayoutInstruction {
            request_id: "req_1".into(),
            to_address: "TAddr".into(),
            network: Some("tron".into()),
            coin_symbol: "USDT".into(),
            amount: dec!(40.50),
            memo: None,
        }
    }

    #[test]
    fn request_carries_api_key_and_idempotency_key() {
        let provider = HttpPayoutProvider::new(
            "https://payouts.invalid/v1/".into(),
            "secret-key".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        let request = provider.payout_request(&instruction()).build().unwrap();

        assert_eq!(request.url().as_str(), "https://payouts.invalid/v1/payouts");
        assert_eq!(request.headers()["x-api-key"], "secret-key");
        assert_eq!(request.headers()["idempotency-key"], "req_1");
        assert!(!request.headers().contains_key("authorization"));
    }

    #[test]
    fn payload_carries_amount_as_string() {
        let payload = build_payout_payload(&instruction());
        assert_eq!(payload["amount"], "40.50");
        assert_eq!(payload["reference"], "req_1");
        assert_eq!(payload["destination"]["network"], "tron");
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        assert!(matches!(
            HttpPayoutProvider::new("not a url".into(), "key".into(), Duration::from_secs(1)),
            Err(PayoutError::Request(_))
        ));
    }
}
