//! Cart client
//!
//! Client side of the storefront cart: guest cart persistence, the cart
//! service over the cart API, the optimistic cart store and the
//! guest → account migration run on sign-in.
//!
//! ```text
//! AuthWatcher ──sign-in──▶ Migrator ──▶ CartBackend (guest | remote)
//!      │
//!      ▼
//! CartStore ──guest──▶ GuestCartStore ──▶ LocalStorage (redb)
//!      └─────account──▶ CartService ──▶ HttpClient ──▶ cart API
//! ```

pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guest;
pub mod http;
pub mod logger;
pub mod migration;
pub mod optimistic;
pub mod service;
pub mod storage;
pub mod store;

pub use auth::{AuthState, AuthWatcher};
pub use backend::{CartBackend, RemoteCartBackend};
pub use catalog::{Catalog, StaticCatalog};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use guest::GuestCartStore;
pub use http::{HttpClient, NetworkHttpClient};
pub use migration::{MIGRATION_FAILED_MESSAGE, MigrationReport, Migrator};
pub use optimistic::OptimisticMutation;
pub use service::{CartService, CouponOutcome, InFlight, Subscription};
pub use storage::{LocalStorage, StorageError};
pub use store::CartStore;
