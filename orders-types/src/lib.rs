//! # Orders Types
//!
//! Domain types and port traits for the marketplace order & ledger engine.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Order, OrderItem, Listing, ledger rows)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    BizType, ContactReveal, Currency, Listing, ListingId, Money, NewContactReveal, NewVoucherEntry,
    Order, OrderId, OrderItem, OrderItemId, OrderRef, OrderStatus, PaymentReceipt, ProductType,
    TargetType, User, UserId, VoucherChange, VoucherEntry, format_order_no, legacy_voucher_count,
};
pub use dto::*;
pub use error::{AppError, DomainError, MoneyParseError, RepoError};
pub use ports::{GatewayError, IdError, IdGenerator, LedgerStore, LedgerTx, PayParams, PaymentGateway};
