use std::sync::Arc;

use cart_api_mock::{MockState, router};
use rust_decimal::Decimal;
use shared::cart::{CatalogEntry, Coupon, CouponType};

/// A small demo catalog so the mock is usable by hand
fn seed(state: &MockState) {
    let product = |id: &str, name: &str, price: i64, stock: u32| CatalogEntry {
        id: id.into(),
        name: Some(name.into()),
        is_active: true,
        stock,
        price: Some(Decimal::from(price)),
    };
    state.put_product(product("led-bulb-9w", "LED bulb 9W", 120, 500));
    state.put_product(product("ceiling-fan", "Ceiling fan", 2499, 40));
    state.put_product(product("smart-switch", "Smart switch", 899, 0));
    state.put_service(product("fan-install", "Fan installation", 349, 20));
    state.put_coupon(Coupon {
        code: "WELCOME10".into(),
        coupon_type: CouponType::Percentage,
        value: Decimal::from(10),
        min_order_amount: Some(Decimal::from(500)),
        max_discount: Some(Decimal::from(300)),
        usage_limit: None,
        used_count: 0,
        expires_at: None,
        is_active: true,
    });
    state.put_coupon(Coupon {
        code: "FREESHIP".into(),
        coupon_type: CouponType::Shipping,
        value: Decimal::ZERO,
        min_order_amount: None,
        max_discount: None,
        usage_limit: Some(100),
        used_count: 0,
        expires_at: None,
        is_active: true,
    });
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cart_api_mock=debug,info".into()),
        )
        .init();

    let port: u16 = std::env::var("CART_MOCK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3900);

    let state = Arc::new(MockState::default());
    seed(&state);
    let demo_token = state.sign_in("demo-user");

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        token = %demo_token,
        "Mock cart API listening"
    );
    axum::serve(listener, router(state)).await
}
