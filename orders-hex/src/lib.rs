//! # Orders Hex
//!
//! Application services and HTTP adapter for the order & ledger engine.
//!
//! ## Architecture
//!
//! - `service/` - Order and voucher services (orchestrate domain operations)
//! - `id_gen/` - Snowflake-style ID source for order numbers
//! - `gateway/` - Payment parameter signing
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The services are generic over `S: LedgerStore`, allowing
//! different store implementations to be injected.

pub mod gateway;
pub mod id_gen;
pub mod inbound;
pub mod openapi;
pub mod service;


pub use gateway::JsapiPayGateway;
pub use id_gen::SnowflakeGenerator;
pub use service::{MAX_TOP_HOURS, OrderService, VoucherService, VoucherSummary};
