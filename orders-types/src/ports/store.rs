//! Ledger store port.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory test doubles) implement both traits.

use chrono::{DateTime, Utc};

use crate::domain::{
    ContactReveal, Listing, ListingId, NewContactReveal, NewVoucherEntry, Order, OrderId,
    OrderItem, OrderRef, User, UserId, VoucherChange, VoucherEntry,
};
use crate::error::RepoError;

/// Read access plus the entry point for units of work.
///
/// Reads here run outside any transaction. Never call them while a
/// [`LedgerTx`] from the same store is open: single-connection adapters
/// would wait on themselves.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Opens a unit of work. Dropping it without [`LedgerTx::commit`] rolls
    /// every write back.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────────────

    async fn get_order(&self, order: &OrderRef) -> Result<Option<Order>, RepoError>;

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Collaborator projections
    // ─────────────────────────────────────────────────────────────────────────────

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, RepoError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// One page of a user's ledger, newest first.
    async fn list_voucher_entries(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VoucherEntry>, RepoError>;

    async fn count_voucher_entries(&self, user_id: UserId) -> Result<i64, RepoError>;

    /// One page of the contacts a user revealed, newest first.
    async fn list_contact_reveals(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContactReveal>, RepoError>;
}

/// A unit of work: every write commits together or not at all.
#[async_trait::async_trait]
pub trait LedgerTx: Send {
    /// Inserts a new order. A duplicate `order_no` is a [`RepoError::Conflict`].
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepoError>;

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<(), RepoError>;

    /// Reads an order and holds its row lock until the unit of work ends.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepoError>;

    /// Writes the paid fields only if the stored row is still Pending.
    ///
    /// Returns `false` when another writer already moved it out of Pending.
    async fn mark_order_paid(&mut self, order: &Order) -> Result<bool, RepoError>;

    async fn list_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, RepoError>;

    /// Reads a listing and holds its row lock until the unit of work ends.
    async fn lock_listing(&mut self, id: ListingId) -> Result<Option<Listing>, RepoError>;

    /// Persists the top window and refresh time of a locked listing.
    async fn save_listing_schedule(&mut self, listing: &Listing) -> Result<(), RepoError>;

    /// Atomically adds `delta` to the user's voucher balance.
    ///
    /// The update is a single conditional statement that refuses to go below
    /// zero, failing with `DomainError::InsufficientVoucher`. A missing user
    /// is [`RepoError::NotFound`].
    async fn adjust_voucher_balance(
        &mut self,
        user_id: UserId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> Result<VoucherChange, RepoError>;

    async fn append_voucher_entry(
        &mut self,
        entry: &NewVoucherEntry,
    ) -> Result<VoucherEntry, RepoError>;

    async fn append_contact_reveal(
        &mut self,
        user_id: UserId,
        reveal: &NewContactReveal,
        at: DateTime<Utc>,
    ) -> Result<ContactReveal, RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}
