//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use orders_types::{
    AppError, CreateContactVoucherOrderRequest, CreateOrderResponse, CreateRefreshOrderRequest,
    CreateTopOrderRequest, LedgerStore, NewContactReveal, Order, OrderDetailResponse, OrderId,
    OrderItemResponse, OrderRef, OrderResponse, PayNotifyRequest, PayOrderRequest, PaymentGateway,
    VoucherBalanceResponse, VoucherCostRequest, VoucherEntryResponse, VoucherSummaryQuery,
    VoucherSummaryResponse,
};
use utoipa::OpenApi;

use super::auth::{CurrentUser, unauthorized_response};
use crate::openapi::ApiDoc;
use crate::{OrderService, VoucherService};

pub const PAY_SIGNATURE_HEADER: &str = "x-pay-signature";

const DEFAULT_PAY_CHANNEL: &str = "wxpay";

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore> {
    pub orders: OrderService<S>,
    pub vouchers: VoucherService<S>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// HMAC key the provider signs notify bodies with.
    pub notify_secret: String,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::InsufficientVoucher { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Serves the OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

/// Signs pay params for a freshly created order.
fn pay_response<S: LedgerStore>(
    state: &AppState<S>,
    order: Order,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let pay_params = state
        .gateway
        .build_pay_params(&order.order_no, &order.amount_total)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            order_no: order.order_no,
            amount: order.amount_total,
            pay_params,
        }),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn create_top_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateTopOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (order, _) = state
        .orders
        .create_top_order(user_id, req.listing_id, req.top_hours, req.price)
        .await?;
    pay_response(&state, order)
}

#[tracing::instrument(skip(state))]
pub async fn create_contact_voucher_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateContactVoucherOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (order, _) = state
        .orders
        .create_contact_voucher_order(user_id, req.price, req.contact_voucher_num)
        .await?;
    pay_response(&state, order)
}

#[tracing::instrument(skip(state))]
pub async fn create_refresh_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateRefreshOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (order, _) = state
        .orders
        .create_refresh_order(user_id, req.listing_id, req.price)
        .await?;
    pay_response(&state, order)
}

/// Get an order by id or order number.
#[tracing::instrument(skip(state))]
pub async fn get_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order_ref = match Uuid::parse_str(&id) {
        Ok(uuid) => OrderRef::Id(OrderId::from_uuid(uuid)),
        Err(_) => OrderRef::No(id),
    };

    let (order, items) = state.orders.get_order(user_id, order_ref).await?;
    Ok(Json(OrderDetailResponse {
        order: order.into(),
        items: items.into_iter().map(OrderItemResponse::from).collect(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment
// ─────────────────────────────────────────────────────────────────────────────

/// Client-reported payment result.
#[tracing::instrument(skip(state))]
pub async fn pay_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<PayOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order_ref = OrderRef::from_parts(req.order_id, req.order_no)
        .ok_or_else(|| AppError::BadRequest("order_id or order_no is required".into()))?;

    let order = state
        .orders
        .pay_order(
            user_id,
            order_ref,
            req.price,
            req.pay_channel.unwrap_or_else(|| DEFAULT_PAY_CHANNEL.to_string()),
            req.pay_trade_no.unwrap_or_default(),
        )
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// Provider notification. Authenticated by an HMAC over the raw body.
#[tracing::instrument(skip(state, headers, body))]
pub async fn pay_notify<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = headers
        .get(PAY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !orders_repo::security::verify_signature(&body, signature, &state.notify_secret) {
        tracing::warn!("Rejected notify with a bad signature");
        return Ok(unauthorized_response("Invalid notify signature"));
    }

    let req: PayNotifyRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid notify body: {}", e)))?;

    let order = state
        .orders
        .pay_order_by_notify(
            &req.order_no,
            Some(req.amount),
            req.pay_channel
                .unwrap_or_else(|| DEFAULT_PAY_CHANNEL.to_string()),
            req.trade_no,
        )
        .await?;
    Ok(Json(OrderResponse::from(order)).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Vouchers
// ─────────────────────────────────────────────────────────────────────────────

/// Spend one voucher to reveal a contact.
#[tracing::instrument(skip(state))]
pub async fn voucher_cost<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<VoucherCostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reveal = NewContactReveal {
        purpose_id: req.purpose_id,
        purpose_type: req.purpose_type,
        purpose_user_id: req.purpose_user_id,
        purpose_user_phone: req.purpose_user_phone,
    };

    let contact_voucher_num = state.vouchers.spend_for_contact(user_id, reveal).await?;
    Ok(Json(VoucherBalanceResponse {
        contact_voucher_num,
    }))
}

/// Balance and ledger page.
#[tracing::instrument(skip(state))]
pub async fn voucher_summary<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<VoucherSummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .vouchers
        .voucher_summary(user_id, query.page, query.page_size)
        .await?;

    Ok(Json(VoucherSummaryResponse {
        contact_voucher_num: summary.balance,
        entries: summary
            .entries
            .into_iter()
            .map(VoucherEntryResponse::from)
            .collect(),
        total: summary.total,
        page: summary.page,
        page_size: summary.page_size,
    }))
}

/// Contacts the caller revealed.
#[tracing::instrument(skip(state))]
pub async fn contact_reveals<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<VoucherSummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reveals = state
        .vouchers
        .contact_reveals(user_id, query.page, query.page_size)
        .await?;
    Ok(Json(reveals))
}
