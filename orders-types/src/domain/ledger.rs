//! Append-only history rows: the voucher ledger and contact reveals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::UserId;

/// Why a voucher balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BizType {
    /// Vouchers credited by a paid order (or an operator grant).
    Buy,
    /// Vouchers spent.
    Cost,
}

impl AsRef<str> for BizType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Buy => "BUY",
            Self::Cost => "COST",
        }
    }
}

impl std::fmt::Display for BizType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for BizType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "COST" => Ok(Self::Cost),
            other => Err(format!("Unknown biz type: {}", other)),
        }
    }
}

/// Balance before and after one atomic adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherChange {
    pub last_num: i32,
    pub next_num: i32,
}

impl VoucherChange {
    pub fn delta(&self) -> i32 {
        self.next_num - self.last_num
    }
}

/// A ledger row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoucherEntry {
    pub id: i64,
    pub user_id: UserId,
    pub biz_type: BizType,
    pub change_num: i32,
    pub last_num: i32,
    pub next_num: i32,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

/// A ledger row about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoucherEntry {
    pub user_id: UserId,
    pub biz_type: BizType,
    pub change_num: i32,
    pub last_num: i32,
    pub next_num: i32,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

impl NewVoucherEntry {
    /// Builds the row for an adjustment the store already applied.
    pub fn for_change(
        user_id: UserId,
        biz_type: BizType,
        change: VoucherChange,
        remark: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            biz_type,
            change_num: change.delta(),
            last_num: change.last_num,
            next_num: change.next_num,
            remark: remark.into(),
            created_at,
        }
    }
}

/// Record of a voucher spent on revealing someone's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContactReveal {
    pub id: i64,
    pub user_id: UserId,
    pub purpose_id: i64,
    pub purpose_type: i32,
    pub purpose_user_id: Option<UserId>,
    pub purpose_user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a voucher is being spent on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactReveal {
    pub purpose_id: i64,
    pub purpose_type: i32,
    pub purpose_user_id: Option<UserId>,
    pub purpose_user_phone: Option<String>,
}
