//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod gateway;
mod id;
mod store;

pub use gateway::{GatewayError, PayParams, PaymentGateway};
pub use id::{IdError, IdGenerator};
pub use store::{LedgerStore, LedgerTx};
