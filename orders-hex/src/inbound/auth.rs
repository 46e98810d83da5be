//! Caller identity middleware.
//!
//! The upstream auth gateway authenticates users and forwards the id in
//! `X-User-Id`. This layer only parses it and rejects requests without one.

use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use orders_types::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

/// Paths reachable without a caller identity.
pub(super) fn is_public(path: &str) -> bool {
    path == "/health" || path == "/api-docs/openapi.json" || path == "/api/pay/notify"
}

/// Parses a user id header value. Only positive ids are accepted.
fn parse_user_id(header: Option<&str>) -> Option<UserId> {
    let id: i64 = header?.trim().parse().ok()?;
    (id > 0).then(|| UserId::new(id))
}

/// Identity middleware.
///
/// Public paths pass through untouched; everything else needs a valid
/// `X-User-Id` or gets 401.
pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok());

    match parse_user_id(header) {
        Some(user_id) => {
            request.extensions_mut().insert(CurrentUser(user_id));
            next.run(request).await
        }
        None => unauthorized_response("Missing or invalid X-User-Id header"),
    }
}

pub(super) fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id(Some("42")), Some(UserId::new(42)));
        assert_eq!(parse_user_id(Some(" 7 ")), Some(UserId::new(7)));
    }

    #[test]
    fn test_parse_user_id_rejects_garbage() {
        assert_eq!(parse_user_id(None), None);
        assert_eq!(parse_user_id(Some("")), None);
        assert_eq!(parse_user_id(Some("abc")), None);
        assert_eq!(parse_user_id(Some("0")), None);
        assert_eq!(parse_user_id(Some("-3")), None);
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/pay/notify"));
        assert!(!is_public("/api/pay"));
        assert!(!is_public("/api/vouchers"));
    }
}
