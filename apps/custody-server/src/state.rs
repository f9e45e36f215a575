// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::workflow::WithdrawalEngine;

/// Token verification settings.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// HS256 shared secret. `None` means tokens cannot be verified.
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim, if any.
    pub audience: Option<String>,
}

impl AuthConfig {
    /// How tokens are checked: `hs256`, `unverified` (dev builds), or
    /// `unconfigured`.
    pub fn mode(&self) -> &'static str {
        if self.jwt_secret.is_some() {
            "hs256"
        } else if cfg!(feature = "dev") {
            "unverified"
        } else {
            "unconfigured"
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WithdrawalEngine>,
    pub auth_config: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(engine: WithdrawalEngine, auth_config: AuthConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            auth_config: Arc::new(auth_config),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for extractor and router tests.

    use std::sync::Arc;

    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::{AppState, AuthConfig};
    use crate::auth::claims::{AppMetadata, JwtClaims};
    use crate::ledger::InMemoryLedger;
    use crate::storage::audit::InMemoryAuditLog;
    use crate::withdrawal::InMemoryWithdrawalStore;
    use crate::workflow::WithdrawalEngine;

    pub const TEST_SECRET: &str = "test-secret-do-not-use";

    pub struct TestContext {
        pub state: AppState,
        pub ledger: Arc<InMemoryLedger>,
        pub store: Arc<InMemoryWithdrawalStore>,
        pub audit: Arc<InMemoryAuditLog>,
    }

    pub fn context() -> TestContext {
        context_with(|engine| engine)
    }

    pub fn context_with(configure: impl FnOnce(WithdrawalEngine) -> WithdrawalEngine) -> TestContext {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryWithdrawalStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = WithdrawalEngine::new(ledger.clone(), store.clone(), audit.clone());
        let state = AppState::new(
            configure(engine),
            AuthConfig {
                jwt_secret: Some(TEST_SECRET.to_string()),
                audience: None,
            },
        );
        TestContext {
            state,
            ledger,
            store,
            audit,
        }
    }

    /// Signed token valid for an hour.
    pub fn token(user_id: &str, role: Option<&str>) -> String {
        token_with(TEST_SECRET, user_id, role, Utc::now().timestamp() + 3600)
    }

    pub fn token_with(secret: &str, user_id: &str, role: Option<&str>, exp: i64) -> String {
        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp,
            iat: Some(Utc::now().timestamp()),
            aud: None,
            session_id: Some("sess_test".to_string()),
            app_metadata: Some(AppMetadata {
                role: role.map(str::to_string),
            }),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }
}
