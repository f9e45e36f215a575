// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the admin API.
//!
//! ## Auth Flow
//!
//! 1. The identity provider issues an HS256 access token signed with the
//!    shared `JWT_SECRET`
//! 2. The admin console sends `Authorization: Bearer <token>`
//! 3. The server:
//!    - Verifies signature, expiry and (if configured) audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `app_metadata.role` → [`Role`] (defaults to `user`)
//!
//! ## Security
//!
//! - Every `/v1/admin` route requires a staff role
//! - Capability checks per operation live in [`roles::Role::can`]
//! - Clock skew tolerance is 60 seconds
//! - Unsigned decoding exists only in builds with the `dev` feature

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::{Action, Role};
