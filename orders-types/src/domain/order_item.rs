//! Order line items: immutable priced snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::listing::ListingId;
use super::money::Money;
use super::order::OrderId;

/// Unique identifier for an OrderItem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderItemId(Uuid);

impl OrderItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for OrderItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The paid add-ons that can be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Top placement of a listing for a number of hours.
    Top,
    /// A bundle of contact vouchers credited to the buyer.
    ContactVoucher,
    /// Bumps a listing's refresh time.
    Refresh,
}

impl ProductType {
    /// Prefix used for order numbers of this product.
    pub fn order_no_prefix(&self) -> &'static str {
        match self {
            Self::Top => "TOP",
            Self::ContactVoucher => "CV",
            Self::Refresh => "RF",
        }
    }
}

impl AsRef<str> for ProductType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Top => "TOP",
            Self::ContactVoucher => "CONTACT_VOUCHER",
            Self::Refresh => "REFRESH",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOP" => Ok(Self::Top),
            "CONTACT_VOUCHER" => Ok(Self::ContactVoucher),
            "REFRESH" => Ok(Self::Refresh),
            other => Err(format!("Unknown product type: {}", other)),
        }
    }
}

/// Kind of entity an item acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Listing,
}

impl AsRef<str> for TargetType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Listing => "LISTING",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LISTING" => Ok(Self::Listing),
            other => Err(format!("Unknown target type: {}", other)),
        }
    }
}

/// A line item of an order.
///
/// Title and price are captured when the order is created and never change;
/// fulfillment reads them instead of the current catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_type: ProductType,
    pub title_snapshot: String,
    pub unit_price_snapshot: Money,
    pub target_type: Option<TargetType>,
    pub target_id: Option<ListingId>,
    pub top_hour: Option<i32>,
    pub contact_voucher_num: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Top placement of `listing_id` for `hours`.
    pub fn top(
        order_id: OrderId,
        listing_id: ListingId,
        hours: i32,
        price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            product_type: ProductType::Top,
            title_snapshot: format!("Top placement {}h", hours),
            unit_price_snapshot: price,
            target_type: Some(TargetType::Listing),
            target_id: Some(listing_id),
            top_hour: Some(hours),
            contact_voucher_num: None,
            created_at,
        }
    }

    /// A bundle of `count` contact vouchers.
    pub fn contact_voucher(
        order_id: OrderId,
        count: i32,
        price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            product_type: ProductType::ContactVoucher,
            title_snapshot: format!("Contact voucher x{}", count),
            unit_price_snapshot: price,
            target_type: None,
            target_id: None,
            top_hour: None,
            contact_voucher_num: Some(count),
            created_at,
        }
    }

    /// A refresh of `listing_id`.
    pub fn refresh(
        order_id: OrderId,
        listing_id: ListingId,
        price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            product_type: ProductType::Refresh,
            title_snapshot: "Listing refresh".to_string(),
            unit_price_snapshot: price,
            target_type: Some(TargetType::Listing),
            target_id: Some(listing_id),
            top_hour: None,
            contact_voucher_num: None,
            created_at,
        }
    }
}

/// Reads a voucher count out of a title written by older releases.
///
/// Only the one-time backfill uses this; fulfillment reads
/// `contact_voucher_num` exclusively.
pub fn legacy_voucher_count(title: &str) -> Option<i32> {
    let title = title.trim();
    let rest = title
        .strip_prefix("联系券-")
        .or_else(|| title.strip_prefix("Contact voucher x"))?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|n: &i32| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_item_snapshot() {
        let order_id = OrderId::new();
        let item = OrderItem::top(order_id, ListingId::new(3), 72, Money::from_cents(500), Utc::now());
        assert_eq!(item.product_type, ProductType::Top);
        assert_eq!(item.target_id, Some(ListingId::new(3)));
        assert_eq!(item.top_hour, Some(72));
        assert_eq!(item.unit_price_snapshot.as_str(), "5.00");
        assert_eq!(item.title_snapshot, "Top placement 72h");
    }

    #[test]
    fn test_voucher_item_snapshot() {
        let item = OrderItem::contact_voucher(OrderId::new(), 10, Money::from_cents(990), Utc::now());
        assert_eq!(item.contact_voucher_num, Some(10));
        assert!(item.target_id.is_none());
    }

    #[test]
    fn test_legacy_title_parsing() {
        assert_eq!(legacy_voucher_count("联系券-5张"), Some(5));
        assert_eq!(legacy_voucher_count("Contact voucher x12"), Some(12));
        assert_eq!(legacy_voucher_count("联系券-0张"), None);
        assert_eq!(legacy_voucher_count("置顶套餐-72小时"), None);
        assert_eq!(legacy_voucher_count(""), None);
    }

    #[test]
    fn test_product_type_round_trip() {
        for p in [ProductType::Top, ProductType::ContactVoucher, ProductType::Refresh] {
            assert_eq!(p.as_ref().parse::<ProductType>().unwrap(), p);
        }
    }
}
