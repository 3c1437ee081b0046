//! # API Shared
//!
//! Shared wire types for the MedBill HTTP API.
//!
//! Contains:
//! - Request and response bodies (`dto` module), serialised in camelCase
//! - `HealthService` for the liveness endpoint
//!
//! Used by `api-rest`; kept free of core types so the wire format can evolve separately
//! from the billing logic.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
