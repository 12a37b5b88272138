//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - completion providers (OpenAI, scripted mock)
//! - `auth` - bearer token validation (OIDC, mock)
//! - `http` - axum REST and SSE endpoints
//! - `memory` - in-memory stores for tests and local runs
//! - `postgres` - PostgreSQL stores

pub mod ai;
pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
