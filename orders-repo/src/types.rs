//! Database row types shared by the SQLite and PostgreSQL adapters.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use orders_types::{
    BizType, ContactReveal, Currency, Listing, ListingId, Money, Order, OrderId, OrderItem,
    OrderItemId, OrderStatus, ProductType, RepoError, TargetType, User, UserId, VoucherEntry,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column lists
// ─────────────────────────────────────────────────────────────────────────────

pub const ORDER_COLUMNS: &str = "id, order_no, user_id, amount_total, amount_paid, currency, \
     status, pay_channel, pay_trade_no, paid_at, canceled_at, refunded_at, remark, created_at, \
     updated_at";

pub const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_type, title_snapshot, \
     unit_price_snapshot, target_type, target_id, top_hour, contact_voucher_num, created_at";

pub const LISTING_COLUMNS: &str =
    "id, user_id, title, top_start_time, top_end_time, refresh_time, updated_at";

pub const USER_COLUMNS: &str = "id, name, contact_voucher_num, updated_at";

pub const VOUCHER_ENTRY_COLUMNS: &str =
    "id, user_id, biz_type, change_num, last_num, next_num, remark, created_at";

pub const CONTACT_REVEAL_COLUMNS: &str =
    "id, user_id, purpose_id, purpose_type, purpose_user_id, purpose_user_phone, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

pub fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Like [`db_err`], but a unique-key violation becomes [`RepoError::Conflict`].
pub fn write_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => db_err(e),
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> RepoError {
    RepoError::Database(format!("Invalid {} in row: {}", column, err))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Order row from database.
#[derive(FromRow)]
pub struct DbOrder {
    pub id: Uuid,
    pub order_no: String,
    pub user_id: i64,
    pub amount_total: String,
    pub amount_paid: String,
    pub currency: String,
    pub status: String,
    pub pay_channel: Option<String>,
    pub pay_trade_no: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbOrder {
    pub fn into_domain(self) -> Result<Order, RepoError> {
        Ok(Order {
            id: OrderId::from_uuid(self.id),
            order_no: self.order_no,
            user_id: UserId::new(self.user_id),
            amount_total: Money::from_string(self.amount_total),
            amount_paid: Money::from_string(self.amount_paid),
            currency: self.currency.parse::<Currency>().map_err(|e| corrupt("currency", e))?,
            status: self.status.parse::<OrderStatus>().map_err(|e| corrupt("status", e))?,
            pay_channel: self.pay_channel,
            pay_trade_no: self.pay_trade_no,
            paid_at: self.paid_at,
            canceled_at: self.canceled_at,
            refunded_at: self.refunded_at,
            remark: self.remark,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Order item row from database.
#[derive(FromRow)]
pub struct DbOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_type: String,
    pub title_snapshot: String,
    pub unit_price_snapshot: String,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub top_hour: Option<i32>,
    pub contact_voucher_num: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl DbOrderItem {
    pub fn into_domain(self) -> Result<OrderItem, RepoError> {
        let target_type = self
            .target_type
            .map(|t| t.parse::<TargetType>())
            .transpose()
            .map_err(|e| corrupt("target_type", e))?;

        Ok(OrderItem {
            id: OrderItemId::from_uuid(self.id),
            order_id: OrderId::from_uuid(self.order_id),
            product_type: self
                .product_type
                .parse::<ProductType>()
                .map_err(|e| corrupt("product_type", e))?,
            title_snapshot: self.title_snapshot,
            unit_price_snapshot: Money::from_string(self.unit_price_snapshot),
            target_type,
            target_id: self.target_id.map(ListingId::new),
            top_hour: self.top_hour,
            contact_voucher_num: self.contact_voucher_num,
            created_at: self.created_at,
        })
    }
}

/// Listing projection row.
#[derive(FromRow)]
pub struct DbListing {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub top_start_time: Option<DateTime<Utc>>,
    pub top_end_time: Option<DateTime<Utc>>,
    pub refresh_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DbListing {
    pub fn into_domain(self) -> Listing {
        Listing {
            id: ListingId::new(self.id),
            user_id: UserId::new(self.user_id),
            title: self.title,
            top_start_time: self.top_start_time,
            top_end_time: self.top_end_time,
            refresh_time: self.refresh_time,
            updated_at: self.updated_at,
        }
    }
}

/// User projection row.
#[derive(FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub contact_voucher_num: i32,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub fn into_domain(self) -> User {
        User {
            id: UserId::new(self.id),
            name: self.name,
            contact_voucher_num: self.contact_voucher_num,
            updated_at: self.updated_at,
        }
    }
}

/// Voucher ledger row.
#[derive(FromRow)]
pub struct DbVoucherEntry {
    pub id: i64,
    pub user_id: i64,
    pub biz_type: String,
    pub change_num: i32,
    pub last_num: i32,
    pub next_num: i32,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

impl DbVoucherEntry {
    pub fn into_domain(self) -> Result<VoucherEntry, RepoError> {
        Ok(VoucherEntry {
            id: self.id,
            user_id: UserId::new(self.user_id),
            biz_type: self.biz_type.parse::<BizType>().map_err(|e| corrupt("biz_type", e))?,
            change_num: self.change_num,
            last_num: self.last_num,
            next_num: self.next_num,
            remark: self.remark,
            created_at: self.created_at,
        })
    }
}

/// Contact reveal row.
#[derive(FromRow)]
pub struct DbContactReveal {
    pub id: i64,
    pub user_id: i64,
    pub purpose_id: i64,
    pub purpose_type: i32,
    pub purpose_user_id: Option<i64>,
    pub purpose_user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbContactReveal {
    pub fn into_domain(self) -> ContactReveal {
        ContactReveal {
            id: self.id,
            user_id: UserId::new(self.user_id),
            purpose_id: self.purpose_id,
            purpose_type: self.purpose_type,
            purpose_user_id: self.purpose_user_id.map(UserId::new),
            purpose_user_phone: self.purpose_user_phone,
            created_at: self.created_at,
        }
    }
}

/// Contact-voucher item whose count still lives only in its title.
#[derive(FromRow)]
pub struct DbLegacyVoucherItem {
    pub id: Uuid,
    pub title_snapshot: String,
}
