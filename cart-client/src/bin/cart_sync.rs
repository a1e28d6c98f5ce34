//! cart-sync: show the persisted guest cart and, with a token, migrate it
//!
//! ```text
//! CART_STORAGE_PATH=./data/cart.redb cart-sync
//! CART_AUTH_TOKEN=mock-... cart-sync
//! ```

use anyhow::Context;
use cart_client::{
    AuthState, AuthWatcher, CartService, CartStore, ClientConfig, GuestCartStore, LocalStorage,
    NetworkHttpClient,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    cart_client::logger::init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    let storage = match &config.storage_path {
        Some(path) => LocalStorage::open(path)
            .with_context(|| format!("failed to open local storage at {}", path.display()))?,
        None => LocalStorage::open_in_memory()?,
    };
    let guest = Arc::new(GuestCartStore::open(storage));

    println!(
        "Guest cart: {} line(s), {} item(s)",
        guest.items().len(),
        guest.get_cart_items_count()
    );
    for item in guest.items() {
        println!("  {:<40} x{}", item.item_ref.to_string(), item.quantity);
    }
    if guest.is_migrated() {
        println!("Guest cart already migrated");
    }

    let Some(token) = config.token.clone() else {
        info!("No CART_AUTH_TOKEN set, skipping migration");
        return Ok(());
    };

    let http = NetworkHttpClient::from_config(&config).context("failed to build HTTP client")?;
    let service = Arc::new(CartService::new(http));
    let store = Arc::new(CartStore::new(guest, service, config.pricing.clone()));
    let watcher = AuthWatcher::new(store.clone());

    let report = watcher
        .on_auth_change(AuthState::signed_in("cart-sync", token))
        .await?
        .unwrap_or_default();

    println!(
        "Migration: {} migrated, {} error(s), status {:?}",
        report.migrated,
        report.errors.len(),
        store.state().migration_status
    );
    for error in &report.errors {
        println!("  - {}", error);
    }

    let state = store.state();
    if let Some(cart) = &state.cart {
        println!(
            "Account cart {}: {} item(s), total {}",
            cart.id,
            cart.items_count(),
            cart.totals.total
        );
    }
    Ok(())
}
