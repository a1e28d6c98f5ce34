use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use shared::cart::{
    Cart, CartValidation, CatalogEntry, CouponApplication, ItemChanges, ItemRef, NewCartLine,
    ShippingAddress, ShippingOption,
};
use shared::{ApiResponse, ErrorCode};

use crate::error::{ApiError, ApiResult};
use crate::state::{Caller, MockState};

/// Header carrying the guest session id
pub const SESSION_HEADER: &str = "x-session-id";

type Shared = Arc<MockState>;
type Reply<T> = ApiResult<Json<ApiResponse<T>>>;

fn ok<T>(data: T) -> Reply<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn session(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Account if a valid bearer token is present, else the guest session
fn caller(state: &MockState, headers: &HeaderMap) -> ApiResult<Caller> {
    if let Some(token) = bearer(headers) {
        return state.resolve_token(token).map(Caller::Account);
    }
    session(headers)
        .map(|s| Caller::Guest(s.to_string()))
        .ok_or_else(ApiError::not_authenticated)
}

// ========== Carts ==========

/// GET /api/cart
async fn get_account_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply<Cart> {
    let token = bearer(&headers).ok_or_else(ApiError::not_authenticated)?;
    let user_id = state.resolve_token(token)?;
    ok(state.cart(&Caller::Account(user_id))?)
}

/// GET /api/cart/guest
async fn get_guest_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply<Cart> {
    let session_id = session(&headers).ok_or_else(|| {
        ApiError::with_message(ErrorCode::InvalidRequest, "Missing X-Session-Id header")
    })?;
    ok(state.cart(&Caller::Guest(session_id.to_string()))?)
}

/// POST /api/cart/items
async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(line): Json<NewCartLine>,
) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    tracing::debug!(?caller, item = %line.item_ref, quantity = line.quantity, "Add item");
    ok(state.add_item(&caller, line)?)
}

/// PUT /api/cart/items/{id}
async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(changes): Json<ItemChanges>,
) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    ok(state.update_item(&caller, &item_id, changes)?)
}

/// DELETE /api/cart/items/{id}
async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    ok(state.remove_item(&caller, &item_id)?)
}

/// DELETE /api/cart
async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    ok(state.clear(&caller)?)
}

#[derive(Deserialize)]
struct CouponRequest {
    code: String,
}

/// POST /api/cart/coupons
async fn apply_coupon(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(req): Json<CouponRequest>,
) -> Reply<CouponApplication> {
    let caller = caller(&state, &headers)?;
    ok(state.apply_coupon(&caller, &req.code)?)
}

/// DELETE /api/cart/coupons/{code}
async fn remove_coupon(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    ok(state.remove_coupon(&caller, &code)?)
}

/// PUT /api/cart/enhanced/shipping-address
async fn set_shipping_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(address): Json<ShippingAddress>,
) -> Reply<Cart> {
    let caller = caller(&state, &headers)?;
    ok(state.set_shipping_address(&caller, address)?)
}

/// GET /api/cart/enhanced/shipping-options
async fn shipping_options(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Reply<Vec<ShippingOption>> {
    let caller = caller(&state, &headers)?;
    ok(state.shipping_options(&caller)?)
}

/// POST /api/cart/enhanced/validate
async fn validate_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply<CartValidation> {
    let caller = caller(&state, &headers)?;
    ok(state.validate(&caller)?)
}

// ========== Catalog ==========

/// GET /api/products/{id}
async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Reply<CatalogEntry> {
    ok(state.catalog_entry(&ItemRef::product(id))?)
}

/// GET /api/services/{id}
async fn get_service(State(state): State<Shared>, Path(id): Path<String>) -> Reply<CatalogEntry> {
    ok(state.catalog_entry(&ItemRef::service(id))?)
}

/// Fail every request while the mock is switched offline
async fn availability(State(state): State<Shared>, request: Request, next: Next) -> Response {
    state.count_request();
    if state.is_offline() {
        let mut response =
            ApiError::with_message(ErrorCode::NetworkError, "Service unavailable").into_response();
        *response.status_mut() = axum::http::StatusCode::SERVICE_UNAVAILABLE;
        return response;
    }
    next.run(request).await
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/cart", get(get_account_cart).delete(clear_cart))
        .route("/api/cart/guest", get(get_guest_cart))
        .route("/api/cart/items", post(add_item))
        .route("/api/cart/items/{id}", put(update_item).delete(remove_item))
        .route("/api/cart/coupons", post(apply_coupon))
        .route("/api/cart/coupons/{code}", delete(remove_coupon))
        .route("/api/cart/enhanced/shipping-address", put(set_shipping_address))
        .route("/api/cart/enhanced/shipping-options", get(shipping_options))
        .route("/api/cart/enhanced/validate", post(validate_cart))
        .route("/api/products/{id}", get(get_product))
        .route("/api/services/{id}", get(get_service))
        .layer(middleware::from_fn_with_state(state.clone(), availability))
        .with_state(state)
}
