//! Order & Voucher Application Services
//!
//! Orchestrates domain operations through the ledger store port.
//! Contains NO infrastructure logic - pure business orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use orders_types::{
    AppError, BizType, ContactReveal, DomainError, LedgerStore, LedgerTx, ListingId, Money,
    NewContactReveal, NewVoucherEntry, Order, OrderItem, OrderRef, PaymentReceipt, ProductType,
    RepoError, UserId, VoucherEntry, format_order_no,
};

/// Deadline applied to every service operation unless configured otherwise.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5_000);

/// Largest ledger page a caller may ask for.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Longest top placement a single order may buy (one year).
pub const MAX_TOP_HOURS: i32 = 24 * 365;

const CONTACT_REVEAL_REMARK: &str = "contact reveal";

/// Runs `fut` under `deadline`. Expiry drops the future, which rolls back any
/// open unit of work.
async fn within<T, F>(deadline: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(deadline_ms = deadline.as_millis() as u64, "Store operation timed out");
            Err(RepoError::Timeout.into())
        }
    }
}

fn user_not_found(user_id: UserId) -> impl FnOnce(RepoError) -> AppError {
    move |err| match err {
        RepoError::NotFound => AppError::NotFound(format!("User {}", user_id)),
        other => other.into(),
    }
}

/// Validates a client price and converts it to an exact amount.
fn positive_price(price: f64) -> Result<Money, AppError> {
    let cents = Money::cents_from_float(price);
    if !price.is_finite() || cents <= 0 {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    Ok(Money::from_cents(cents))
}

// ─────────────────────────────────────────────────────────────────────────────
// Order Service
// ─────────────────────────────────────────────────────────────────────────────

/// Application service for orders and their payment.
///
/// Generic over `S: LedgerStore` - the adapter is injected at compile time.
/// This enables:
/// - Swapping stores without code changes
/// - Testing with an in-memory store
/// - Compile-time checks for port implementation
pub struct OrderService<S: LedgerStore> {
    store: Arc<S>,
    ids: Arc<dyn orders_types::IdGenerator>,
    deadline: Duration,
}

impl<S: LedgerStore> OrderService<S> {
    /// Creates a new order service over the given store and ID source.
    pub fn new(store: Arc<S>, ids: Arc<dyn orders_types::IdGenerator>) -> Self {
        Self {
            store,
            ids,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Overrides the per-operation deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Order creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a pending order for `top_hours` of top placement on a listing.
    #[tracing::instrument(skip(self))]
    pub async fn create_top_order(
        &self,
        user_id: UserId,
        listing_id: ListingId,
        top_hours: i32,
        price: f64,
    ) -> Result<(Order, OrderItem), AppError> {
        within(self.deadline, async {
            if top_hours <= 0 {
                return Err(AppError::BadRequest("Top hours must be positive".into()));
            }
            if top_hours > MAX_TOP_HOURS {
                return Err(AppError::BadRequest(format!(
                    "Top hours must not exceed {}",
                    MAX_TOP_HOURS
                )));
            }
            let price = positive_price(price)?;
            self.ensure_listing_owner(user_id, listing_id).await?;

            self.place_order(user_id, ProductType::Top, price, |order_id, price, at| {
                OrderItem::top(order_id, listing_id, top_hours, price, at)
            })
            .await
        })
        .await
    }

    /// Creates a pending order for a bundle of contact vouchers.
    #[tracing::instrument(skip(self))]
    pub async fn create_contact_voucher_order(
        &self,
        user_id: UserId,
        price: f64,
        voucher_count: i32,
    ) -> Result<(Order, OrderItem), AppError> {
        within(self.deadline, async {
            if voucher_count <= 0 {
                return Err(AppError::BadRequest("Voucher count must be positive".into()));
            }
            let price = positive_price(price)?;

            self.place_order(user_id, ProductType::ContactVoucher, price, |order_id, price, at| {
                OrderItem::contact_voucher(order_id, voucher_count, price, at)
            })
            .await
        })
        .await
    }

    /// Creates a pending order to refresh a listing.
    #[tracing::instrument(skip(self))]
    pub async fn create_refresh_order(
        &self,
        user_id: UserId,
        listing_id: ListingId,
        price: f64,
    ) -> Result<(Order, OrderItem), AppError> {
        within(self.deadline, async {
            let price = positive_price(price)?;
            self.ensure_listing_owner(user_id, listing_id).await?;

            self.place_order(user_id, ProductType::Refresh, price, |order_id, price, at| {
                OrderItem::refresh(order_id, listing_id, price, at)
            })
            .await
        })
        .await
    }

    async fn ensure_listing_owner(&self, user_id: UserId, listing_id: ListingId) -> Result<(), AppError> {
        let listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Listing {}", listing_id)))?;

        if !listing.is_owned_by(user_id) {
            tracing::warn!(owner = %listing.user_id, "Order for a listing owned by someone else");
            return Err(DomainError::Forbidden.into());
        }
        Ok(())
    }

    /// Persists a pending order and its single line item in one unit of work.
    async fn place_order<F>(
        &self,
        user_id: UserId,
        product: ProductType,
        price: Money,
        build_item: F,
    ) -> Result<(Order, OrderItem), AppError>
    where
        F: FnOnce(orders_types::OrderId, Money, DateTime<Utc>) -> OrderItem,
    {
        let now = Utc::now();
        let order_no = self.next_order_no(product, now);
        let order = Order::pending(order_no, user_id, price.clone(), now);
        let item = build_item(order.id, price, now);

        let mut tx = self.store.begin().await?;
        tx.insert_order(&order).await?;
        tx.insert_order_item(&item).await?;
        tx.commit().await?;

        tracing::info!(
            order_no = %order.order_no,
            product = %product,
            amount = %order.amount_total,
            "Order created"
        );
        Ok((order, item))
    }

    fn next_order_no(&self, product: ProductType, at: DateTime<Utc>) -> String {
        let sequence = match self.ids.next_id() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "ID generator failed, using bare order number");
                None
            }
        };
        format_order_no(product.order_no_prefix(), at, sequence)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a client-reported payment to one of the caller's orders.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(
        &self,
        user_id: UserId,
        order_ref: OrderRef,
        claimed_amount: Option<f64>,
        pay_channel: String,
        pay_trade_no: String,
    ) -> Result<Order, AppError> {
        within(self.deadline, async {
            let order = self.find_order(&order_ref).await?;
            if order.user_id != user_id {
                tracing::warn!(owner = %order.user_id, "Payment for another user's order");
                return Err(DomainError::Forbidden.into());
            }
            self.apply_payment(order, claimed_amount, pay_channel, pay_trade_no)
                .await
        })
        .await
    }

    /// Applies a provider notification. The caller has already authenticated it.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order_by_notify(
        &self,
        order_no: &str,
        claimed_amount: Option<f64>,
        pay_channel: String,
        pay_trade_no: String,
    ) -> Result<Order, AppError> {
        within(self.deadline, async {
            let order = self.find_order(&OrderRef::No(order_no.to_string())).await?;
            self.apply_payment(order, claimed_amount, pay_channel, pay_trade_no)
                .await
        })
        .await
    }

    async fn find_order(&self, order_ref: &OrderRef) -> Result<Order, AppError> {
        self.store
            .get_order(order_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {}", order_ref)))
    }

    /// Marks a pending order paid and fulfills its items, all or nothing.
    ///
    /// Settled orders are returned untouched. When two payments race, the
    /// first conditional update wins and the other returns the winner's order.
    async fn apply_payment(
        &self,
        order: Order,
        claimed_amount: Option<f64>,
        pay_channel: String,
        pay_trade_no: String,
    ) -> Result<Order, AppError> {
        if !order.is_pending() {
            tracing::info!(order_no = %order.order_no, status = %order.status, "Order already settled");
            return Ok(order);
        }

        if let Some(claimed) = claimed_amount.filter(|c| *c > 0.0) {
            let expected = order
                .amount_total
                .to_cents()
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let claimed = Money::cents_from_float(claimed);
            if expected != claimed {
                tracing::warn!(
                    order_no = %order.order_no,
                    expected,
                    claimed,
                    "Rejected payment with mismatched amount"
                );
                return Err(DomainError::AmountMismatch { expected, claimed }.into());
            }
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut current = tx
            .lock_order(order.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {}", order.order_no)))?;
        if !current.is_pending() {
            tracing::info!(order_no = %current.order_no, "Order settled by a concurrent payment");
            return Ok(current);
        }

        current.mark_paid(PaymentReceipt {
            pay_channel,
            pay_trade_no,
            paid_at: now,
        });
        if !tx.mark_order_paid(&current).await? {
            drop(tx);
            tracing::info!(order_no = %current.order_no, "Lost the race to mark order paid");
            return self.find_order(&OrderRef::Id(current.id)).await;
        }

        let items = tx.list_order_items(current.id).await?;
        for item in &items {
            fulfill(tx.as_mut(), &current, item, now).await?;
        }
        tx.commit().await?;

        tracing::info!(
            order_no = %current.order_no,
            items = items.len(),
            amount = %current.amount_paid,
            "Order paid"
        );
        Ok(current)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Returns one of the caller's orders with its items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: UserId,
        order_ref: OrderRef,
    ) -> Result<(Order, Vec<OrderItem>), AppError> {
        within(self.deadline, async {
            let order = self.find_order(&order_ref).await?;
            if order.user_id != user_id {
                return Err(DomainError::Forbidden.into());
            }
            let items = self.store.list_order_items(order.id).await?;
            Ok::<_, AppError>((order, items))
        })
        .await
    }
}

/// Applies one paid line item inside the payment's unit of work.
async fn fulfill(
    tx: &mut dyn LedgerTx,
    order: &Order,
    item: &OrderItem,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    match item.product_type {
        ProductType::Top => {
            let (listing_id, hours) = match (item.target_id, item.top_hour) {
                (Some(listing_id), Some(hours)) if hours > 0 => (listing_id, hours),
                _ => {
                    return Err(AppError::Internal(format!(
                        "Top item {} has no listing or hours",
                        item.id
                    )));
                }
            };
            let mut listing = tx
                .lock_listing(listing_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Listing {}", listing_id)))?;
            listing.extend_top_window(now, hours)?;
            tx.save_listing_schedule(&listing).await?;
            tracing::debug!(listing_id = %listing_id, hours, "Top window extended");
        }
        ProductType::ContactVoucher => {
            let count = item
                .contact_voucher_num
                .filter(|n| *n > 0)
                .ok_or(DomainError::InvalidVoucherNum)?;
            let change = tx
                .adjust_voucher_balance(order.user_id, count, now)
                .await
                .map_err(user_not_found(order.user_id))?;
            tx.append_voucher_entry(&NewVoucherEntry::for_change(
                order.user_id,
                BizType::Buy,
                change,
                format!("order {}", order.order_no),
                now,
            ))
            .await?;
            tracing::debug!(count, balance = change.next_num, "Vouchers credited");
        }
        ProductType::Refresh => {
            let listing_id = item.target_id.ok_or_else(|| {
                AppError::Internal(format!("Refresh item {} has no listing", item.id))
            })?;
            let mut listing = tx
                .lock_listing(listing_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Listing {}", listing_id)))?;
            listing.refresh(now);
            tx.save_listing_schedule(&listing).await?;
            tracing::debug!(listing_id = %listing_id, "Listing refreshed");
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Voucher Service
// ─────────────────────────────────────────────────────────────────────────────

/// Current balance plus one page of the voucher ledger.
#[derive(Debug, Clone)]
pub struct VoucherSummary {
    pub balance: i32,
    pub entries: Vec<VoucherEntry>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Clamps 1-based paging input and returns `(page, page_size, offset)`.
fn paging(page: i64, page_size: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    (page, page_size, (page - 1).saturating_mul(page_size))
}

/// Application service for the contact-voucher balance and its ledger.
pub struct VoucherService<S: LedgerStore> {
    store: Arc<S>,
    deadline: Duration,
}

impl<S: LedgerStore> VoucherService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Overrides the per-operation deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Atomically changes a user's balance and records it in the ledger.
    ///
    /// Returns the new balance. A change that would go below zero fails with
    /// `InsufficientVoucher` and writes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_voucher(
        &self,
        user_id: UserId,
        biz_type: BizType,
        change_num: i32,
        remark: &str,
    ) -> Result<i32, AppError> {
        within(self.deadline, async {
            if change_num == 0 {
                return Err(AppError::BadRequest("Change must not be zero".into()));
            }
            let now = Utc::now();

            let mut tx = self.store.begin().await?;
            let change = tx
                .adjust_voucher_balance(user_id, change_num, now)
                .await
                .map_err(user_not_found(user_id))?;
            tx.append_voucher_entry(&NewVoucherEntry::for_change(
                user_id, biz_type, change, remark, now,
            ))
            .await?;
            tx.commit().await?;

            tracing::info!(
                change = change_num,
                last = change.last_num,
                next = change.next_num,
                "Voucher balance adjusted"
            );
            Ok::<_, AppError>(change.next_num)
        })
        .await
    }

    /// Spends one voucher to reveal a contact and records what was revealed.
    ///
    /// Returns the remaining balance.
    #[tracing::instrument(skip(self, reveal), fields(purpose_id = reveal.purpose_id))]
    pub async fn spend_for_contact(
        &self,
        user_id: UserId,
        reveal: NewContactReveal,
    ) -> Result<i32, AppError> {
        within(self.deadline, async {
            let now = Utc::now();

            let mut tx = self.store.begin().await?;
            let change = tx
                .adjust_voucher_balance(user_id, -1, now)
                .await
                .map_err(user_not_found(user_id))?;
            tx.append_voucher_entry(&NewVoucherEntry::for_change(
                user_id,
                BizType::Cost,
                change,
                CONTACT_REVEAL_REMARK,
                now,
            ))
            .await?;
            tx.append_contact_reveal(user_id, &reveal, now).await?;
            tx.commit().await?;

            tracing::info!(balance = change.next_num, "Voucher spent on contact reveal");
            Ok::<_, AppError>(change.next_num)
        })
        .await
    }

    /// Current balance plus one page of ledger entries, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn voucher_summary(
        &self,
        user_id: UserId,
        page: i64,
        page_size: i64,
    ) -> Result<VoucherSummary, AppError> {
        within(self.deadline, async {
            let (page, page_size, offset) = paging(page, page_size);
            let user = self
                .store
                .get_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
            let entries = self
                .store
                .list_voucher_entries(user_id, page_size, offset)
                .await?;
            let total = self.store.count_voucher_entries(user_id).await?;

            Ok::<_, AppError>(VoucherSummary {
                balance: user.contact_voucher_num,
                entries,
                total,
                page,
                page_size,
            })
        })
        .await
    }

    /// One page of the contacts a user revealed, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn contact_reveals(
        &self,
        user_id: UserId,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ContactReveal>, AppError> {
        within(self.deadline, async {
            let (_, page_size, offset) = paging(page, page_size);
            let reveals = self
                .store
                .list_contact_reveals(user_id, page_size, offset)
                .await?;
            Ok::<_, AppError>(reveals)
        })
        .await
    }
}
