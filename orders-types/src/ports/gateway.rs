//! Payment gateway port.
//!
//! Formatting and signing of client-side payment parameters. The provider's
//! HTTP API is out of scope; this only shapes what the mobile client needs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Money;

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway misconfigured: {0}")]
    Config(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Parameters handed to the mobile client to start a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayParams {
    #[schema(example = "1700000000")]
    pub time_stamp: String,
    pub nonce_str: String,
    #[schema(example = "prepay_id=TOP20240309080501000042")]
    pub package: String,
    #[schema(example = "HMAC-SHA256")]
    pub sign_type: String,
    pub pay_sign: String,
}

/// Port trait for payment providers.
pub trait PaymentGateway: Send + Sync {
    fn build_pay_params(&self, order_no: &str, amount: &Money) -> Result<PayParams, GatewayError>;
}
