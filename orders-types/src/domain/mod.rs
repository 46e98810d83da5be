//! Domain models for the order & ledger engine.

pub mod ledger;
pub mod listing;
pub mod money;
pub mod order;
pub mod order_item;
pub mod user;

pub use ledger::{BizType, ContactReveal, NewContactReveal, NewVoucherEntry, VoucherChange, VoucherEntry};
pub use listing::{Listing, ListingId};
pub use money::{Currency, Money};
pub use order::{Order, OrderId, OrderRef, OrderStatus, PaymentReceipt, format_order_no};
pub use order_item::{OrderItem, OrderItemId, ProductType, TargetType, legacy_voucher_count};
pub use user::{User, UserId};
