//! Order domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::{Currency, Money};
use super::user::UserId;

/// Unique identifier for an Order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random OrderId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an OrderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of an order. Only `Pending -> Paid` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Canceled,
    Refunded,
}

impl AsRef<str> for OrderStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Canceled => "CANCELED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "CANCELED" => Ok(Self::Canceled),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

/// How a caller points at an order. The id is preferred when both are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(OrderId),
    No(String),
}

impl OrderRef {
    /// Picks the id when present, otherwise a non-empty order number.
    pub fn from_parts(id: Option<OrderId>, order_no: Option<String>) -> Option<Self> {
        match (id, order_no) {
            (Some(id), _) => Some(Self::Id(id)),
            (None, Some(no)) if !no.trim().is_empty() => Some(Self::No(no.trim().to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::No(no) => f.write_str(no),
        }
    }
}

/// What the payment provider reported for a successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub pay_channel: String,
    pub pay_trade_no: String,
    pub paid_at: DateTime<Utc>,
}

/// A purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable number, unique and sortable by creation time.
    pub order_no: String,
    pub user_id: UserId,
    pub amount_total: Money,
    pub amount_paid: Money,
    pub currency: Currency,
    pub status: OrderStatus,
    pub pay_channel: Option<String>,
    pub pay_trade_no: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order with nothing paid yet.
    pub fn pending(
        order_no: String,
        user_id: UserId,
        amount_total: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_no,
            user_id,
            amount_total,
            amount_paid: Money::zero(),
            currency: Currency::CNY,
            status: OrderStatus::Pending,
            pay_channel: None,
            pay_trade_no: None,
            paid_at: None,
            canceled_at: None,
            refunded_at: None,
            remark: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Moves the order to Paid, recording the provider receipt.
    ///
    /// The caller guarantees the order was Pending; the store enforces it
    /// again with a conditional update.
    pub fn mark_paid(&mut self, receipt: PaymentReceipt) {
        self.status = OrderStatus::Paid;
        self.amount_paid = self.amount_total.clone();
        self.pay_channel = Some(receipt.pay_channel);
        self.pay_trade_no = Some(receipt.pay_trade_no);
        self.paid_at = Some(receipt.paid_at);
        self.updated_at = receipt.paid_at;
    }
}

/// Formats an order number: `prefix + YYYYMMDDhhmmss + 6-digit suffix`.
///
/// Without a sequence value the bare `prefix + timestamp` is returned.
pub fn format_order_no(prefix: &str, at: DateTime<Utc>, sequence: Option<u64>) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    match sequence {
        Some(seq) => format!("{}{}{:06}", prefix, stamp, seq % 1_000_000),
        None => format!("{}{}", prefix, stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pending_order_has_nothing_paid() {
        let order = Order::pending(
            "TOP1".to_string(),
            UserId::new(1),
            Money::from_cents(500),
            Utc::now(),
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount_paid.to_cents().unwrap(), 0);
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn test_mark_paid_copies_total() {
        let mut order = Order::pending(
            "TOP1".to_string(),
            UserId::new(1),
            Money::from_cents(500),
            Utc::now(),
        );
        let paid_at = Utc::now();
        order.mark_paid(PaymentReceipt {
            pay_channel: "wxpay".to_string(),
            pay_trade_no: "T1".to_string(),
            paid_at,
        });
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.amount_paid, order.amount_total);
        assert_eq!(order.paid_at, Some(paid_at));
        assert_eq!(order.pay_trade_no.as_deref(), Some("T1"));
    }

    #[test]
    fn test_order_no_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 1).unwrap();
        assert_eq!(format_order_no("TOP", at, Some(42)), "TOP20240309080501000042");
        assert_eq!(
            format_order_no("CV", at, Some(98_765_432_101)),
            "CV20240309080501432101"
        );
        assert_eq!(format_order_no("RF", at, None), "RF20240309080501");
    }

    #[test]
    fn test_order_ref_prefers_id() {
        let id = OrderId::new();
        assert_eq!(
            OrderRef::from_parts(Some(id), Some("CV1".into())),
            Some(OrderRef::Id(id))
        );
        assert_eq!(
            OrderRef::from_parts(None, Some(" CV1 ".into())),
            Some(OrderRef::No("CV1".into()))
        );
        assert_eq!(OrderRef::from_parts(None, Some("".into())), None);
    }
}
