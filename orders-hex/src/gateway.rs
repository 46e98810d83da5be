//! JSAPI-style payment gateway adapter.
//!
//! Builds the signed parameter set a mobile client hands to the payment SDK.

use rand::Rng;
use rand::distr::Alphanumeric;

use orders_repo::security::{pay_sign_message, sign_payload};
use orders_types::{GatewayError, Money, PayParams, PaymentGateway};

const NONCE_LEN: usize = 32;
const SIGN_TYPE: &str = "HMAC-SHA256";

/// Signs client payment parameters with the merchant key.
///
/// Built once at startup and shared behind an `Arc`.
pub struct JsapiPayGateway {
    app_id: String,
    merchant_key: String,
}

impl JsapiPayGateway {
    pub fn new(app_id: impl Into<String>, merchant_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            merchant_key: merchant_key.into(),
        }
    }

    fn params_at(&self, order_no: &str, time_stamp: i64, nonce_str: String) -> Result<PayParams, GatewayError> {
        if self.app_id.trim().is_empty() {
            return Err(GatewayError::Config("app id is empty".into()));
        }
        if self.merchant_key.is_empty() {
            return Err(GatewayError::Config("merchant key is empty".into()));
        }

        let time_stamp = time_stamp.to_string();
        let package = format!("prepay_id={}", order_no);
        let message = pay_sign_message(&self.app_id, &time_stamp, &nonce_str, &package);
        let pay_sign = sign_payload(message.as_bytes(), &self.merchant_key);
        if pay_sign.is_empty() {
            return Err(GatewayError::Signing("empty signature".into()));
        }

        Ok(PayParams {
            time_stamp,
            nonce_str,
            package,
            sign_type: SIGN_TYPE.to_string(),
            pay_sign,
        })
    }
}

fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

impl PaymentGateway for JsapiPayGateway {
    #[tracing::instrument(skip(self))]
    fn build_pay_params(&self, order_no: &str, amount: &Money) -> Result<PayParams, GatewayError> {
        self.params_at(order_no, chrono::Utc::now().timestamp(), nonce())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orders_repo::security::verify_signature;

    #[test]
    fn test_params_are_signed_over_the_package() {
        let gateway = JsapiPayGateway::new("wx_app", "merchant_key");
        let params = gateway
            .params_at("TOP20240309080501000042", 1_700_000_000, "n".repeat(NONCE_LEN))
            .unwrap();

        assert_eq!(params.time_stamp, "1700000000");
        assert_eq!(params.package, "prepay_id=TOP20240309080501000042");
        assert_eq!(params.sign_type, "HMAC-SHA256");

        let message = pay_sign_message("wx_app", "1700000000", &params.nonce_str, &params.package);
        assert!(verify_signature(message.as_bytes(), &params.pay_sign, "merchant_key"));
    }

    #[test]
    fn test_nonce_shape() {
        let gateway = JsapiPayGateway::new("wx_app", "merchant_key");
        let params = gateway.build_pay_params("CV1", &Money::from_cents(990)).unwrap();

        assert_eq!(params.nonce_str.len(), NONCE_LEN);
        assert!(params.nonce_str.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_missing_app_id_is_rejected() {
        let gateway = JsapiPayGateway::new("", "merchant_key");
        let err = gateway.build_pay_params("CV1", &Money::from_cents(990)).unwrap_err();

        assert!(matches!(err, GatewayError::Config(_)));
    }
}
