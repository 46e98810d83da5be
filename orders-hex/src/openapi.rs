//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use orders_types::domain::{
    BizType, ContactReveal, Currency, ListingId, OrderId, OrderItemId, OrderStatus, ProductType,
    TargetType, UserId,
};
use orders_types::dto::{
    CreateContactVoucherOrderRequest, CreateOrderResponse, CreateRefreshOrderRequest,
    CreateTopOrderRequest, OrderDetailResponse, OrderItemResponse, OrderResponse,
    PayNotifyRequest, PayOrderRequest, VoucherBalanceResponse, VoucherCostRequest,
    VoucherEntryResponse, VoucherSummaryResponse,
};
use orders_types::ports::PayParams;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

// Dummy functions to generate path documentation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Create a top placement order
#[utoipa::path(
    post,
    path = "/api/orders/top",
    tag = "orders",
    request_body = CreateTopOrderRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Order created, pay params signed", body = CreateOrderResponse),
        (status = 400, description = "Invalid hours or price"),
        (status = 403, description = "Listing belongs to another user"),
        (status = 404, description = "Listing not found")
    )
)]
async fn create_top_order() {}

/// Create a contact voucher bundle order
#[utoipa::path(
    post,
    path = "/api/orders/contact-voucher",
    tag = "orders",
    request_body = CreateContactVoucherOrderRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Order created, pay params signed", body = CreateOrderResponse),
        (status = 400, description = "Invalid count or price")
    )
)]
async fn create_contact_voucher_order() {}

/// Create a listing refresh order
#[utoipa::path(
    post,
    path = "/api/orders/refresh",
    tag = "orders",
    request_body = CreateRefreshOrderRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Order created, pay params signed", body = CreateOrderResponse),
        (status = 403, description = "Listing belongs to another user"),
        (status = 404, description = "Listing not found")
    )
)]
async fn create_refresh_order() {}

/// Get one of the caller's orders
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "orders",
    security(("user_id" = [])),
    params(
        ("id" = String, Path, description = "Order ID (UUID) or order number")
    ),
    responses(
        (status = 200, description = "Order with items", body = OrderDetailResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order() {}

/// Report a client-side payment result
#[utoipa::path(
    post,
    path = "/api/pay",
    tag = "payment",
    request_body = PayOrderRequest,
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Order is paid", body = OrderResponse),
        (status = 400, description = "Amount mismatch or missing order reference"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    )
)]
async fn pay_order() {}

/// Provider payment notification
#[utoipa::path(
    post,
    path = "/api/pay/notify",
    tag = "payment",
    request_body = PayNotifyRequest,
    params(
        ("X-Pay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Order is paid", body = OrderResponse),
        (status = 400, description = "Amount mismatch or malformed body"),
        (status = 401, description = "Bad signature"),
        (status = 404, description = "Order not found")
    )
)]
async fn pay_notify() {}

/// Spend one voucher to reveal a contact
#[utoipa::path(
    post,
    path = "/api/vouchers/cost",
    tag = "vouchers",
    request_body = VoucherCostRequest,
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Remaining balance", body = VoucherBalanceResponse),
        (status = 400, description = "No vouchers left")
    )
)]
async fn voucher_cost() {}

/// Voucher balance and ledger page
#[utoipa::path(
    get,
    path = "/api/vouchers",
    tag = "vouchers",
    security(("user_id" = [])),
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "Entries per page, at most 100")
    ),
    responses(
        (status = 200, description = "Balance and ledger entries", body = VoucherSummaryResponse),
        (status = 404, description = "User not found")
    )
)]
async fn voucher_summary() {}

/// Contacts the caller revealed
#[utoipa::path(
    get,
    path = "/api/vouchers/reveals",
    tag = "vouchers",
    security(("user_id" = [])),
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("page_size" = Option<i64>, Query, description = "Entries per page, at most 100")
    ),
    responses(
        (status = 200, description = "Reveal records, newest first", body = Vec<ContactReveal>)
    )
)]
async fn contact_reveals() {}

/// OpenAPI documentation for the Orders API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Order & Ledger API",
        version = "1.0.0",
        description = "Orders for listing top placement, refreshes and contact vouchers, their payment, and the voucher ledger.\n\n## Identity\n\nRequests arrive through the auth gateway, which sets the caller in the `X-User-Id` header. The provider notify callback is authenticated by `X-Pay-Signature` instead.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_top_order,
        create_contact_voucher_order,
        create_refresh_order,
        get_order,
        pay_order,
        pay_notify,
        voucher_cost,
        voucher_summary,
        contact_reveals,
    ),
    components(
        schemas(
            CreateTopOrderRequest,
            CreateContactVoucherOrderRequest,
            CreateRefreshOrderRequest,
            CreateOrderResponse,
            PayParams,
            PayOrderRequest,
            PayNotifyRequest,
            OrderResponse,
            OrderItemResponse,
            OrderDetailResponse,
            VoucherCostRequest,
            VoucherBalanceResponse,
            VoucherEntryResponse,
            VoucherSummaryResponse,
            ContactReveal,
            BizType,
            Currency,
            OrderStatus,
            ProductType,
            TargetType,
            OrderId,
            OrderItemId,
            ListingId,
            UserId,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "orders", description = "Order creation and lookup"),
        (name = "payment", description = "Client and provider payment results"),
        (name = "vouchers", description = "Contact voucher balance, spending and ledger"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the gateway-provided user header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-User-Id"))),
            );
        }
    }
}
