//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    BizType, Currency, ListingId, Money, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
    ProductType, TargetType, UserId, VoucherEntry,
};
use crate::ports::PayParams;

// ─────────────────────────────────────────────────────────────────────────────
// Order creation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to buy top placement for a listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTopOrderRequest {
    pub listing_id: ListingId,
    /// Hours of top placement to buy, at most one year (8760)
    #[schema(example = 72)]
    pub top_hours: i32,
    /// Price in yuan
    #[schema(example = 5.0)]
    pub price: f64,
}

/// Request to buy a bundle of contact vouchers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateContactVoucherOrderRequest {
    /// Price in yuan
    #[schema(example = 9.9)]
    pub price: f64,
    /// Vouchers in the bundle
    #[schema(example = 10)]
    pub contact_voucher_num: i32,
}

/// Request to buy a refresh for a listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRefreshOrderRequest {
    pub listing_id: ListingId,
    /// Price in yuan
    #[schema(example = 1.0)]
    pub price: f64,
}

/// Response after creating an order: what the client needs to pay it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: OrderId,
    #[schema(example = "TOP20240309080501000042")]
    pub order_no: String,
    #[schema(value_type = String, example = "5.00")]
    pub amount: Money,
    pub pay_params: PayParams,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Client-reported payment result. The order id is preferred over the number.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    /// Amount the client claims was paid, in yuan. Ignored when absent or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_trade_no: Option<String>,
}

/// Server-to-server payment notification from the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayNotifyRequest {
    #[schema(example = "CV20240309080501000042")]
    pub order_no: String,
    /// Amount the provider reports, in yuan
    #[schema(example = 9.9)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_channel: Option<String>,
    pub trade_no: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Order read DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// An order as returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_no: String,
    pub user_id: UserId,
    #[schema(value_type = String, example = "5.00")]
    pub amount_total: Money,
    #[schema(value_type = String, example = "0.00")]
    pub amount_paid: Money,
    pub currency: Currency,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_trade_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_no: order.order_no,
            user_id: order.user_id,
            amount_total: order.amount_total,
            amount_paid: order.amount_paid,
            currency: order.currency,
            status: order.status,
            pay_channel: order.pay_channel,
            pay_trade_no: order.pay_trade_no,
            paid_at: order.paid_at,
            created_at: order.created_at,
        }
    }
}

/// A line item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_type: ProductType,
    pub title_snapshot: String,
    #[schema(value_type = String, example = "5.00")]
    pub unit_price_snapshot: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ListingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_hour: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_voucher_num: Option<i32>,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_type: item.product_type,
            title_snapshot: item.title_snapshot,
            unit_price_snapshot: item.unit_price_snapshot,
            target_type: item.target_type,
            target_id: item.target_id,
            top_hour: item.top_hour,
            contact_voucher_num: item.contact_voucher_num,
        }
    }
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailResponse {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Voucher DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to spend one voucher on revealing a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VoucherCostRequest {
    /// Id of the thing being viewed, e.g. a listing
    #[serde(default)]
    pub purpose_id: i64,
    #[serde(default)]
    pub purpose_type: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_user_phone: Option<String>,
}

/// Balance after a voucher operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoucherBalanceResponse {
    #[schema(example = 9)]
    pub contact_voucher_num: i32,
}

/// Pagination parameters for the voucher ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoucherSummaryQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for VoucherSummaryQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// One ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoucherEntryResponse {
    pub id: i64,
    pub biz_type: BizType,
    pub change_num: i32,
    pub last_num: i32,
    pub next_num: i32,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

impl From<VoucherEntry> for VoucherEntryResponse {
    fn from(entry: VoucherEntry) -> Self {
        Self {
            id: entry.id,
            biz_type: entry.biz_type,
            change_num: entry.change_num,
            last_num: entry.last_num,
            next_num: entry.next_num,
            remark: entry.remark,
            created_at: entry.created_at,
        }
    }
}

/// Current balance plus one page of the ledger, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoucherSummaryResponse {
    pub contact_voucher_num: i32,
    pub entries: Vec<VoucherEntryResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
