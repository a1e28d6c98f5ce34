//! Auth transitions
//!
//! The identity provider reports sign-in and sign-out; the watcher turns
//! each transition into token, cache and migration updates on the store.

use parking_lot::Mutex;
use shared::reducer::{CartAction, MigrationStatus};
use std::sync::Arc;
use tracing::{info, warn};

use crate::ClientResult;
use crate::backend::RemoteCartBackend;
use crate::http::{HttpClient, NetworkHttpClient};
use crate::migration::{MigrationReport, Migrator};
use crate::store::CartStore;

/// Identity provider state, as delivered to its auth-change callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn {
        user_id: String,
        token: String,
    },
}

impl AuthState {
    pub fn signed_in(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::SignedIn {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn { user_id, .. } => Some(user_id),
        }
    }
}

pub struct AuthWatcher<H: HttpClient + 'static = NetworkHttpClient> {
    store: Arc<CartStore<H>>,
    migrator: Migrator,
    current: Mutex<AuthState>,
}

impl<H: HttpClient + 'static> AuthWatcher<H> {
    /// Watcher migrating into the account cart, validated against the
    /// server catalog
    pub fn new(store: Arc<CartStore<H>>) -> Self {
        let service = store.service().clone();
        let migrator = Migrator::new(
            store.guest().clone(),
            Arc::new(RemoteCartBackend::new(service.clone())),
            service,
        );
        Self::with_migrator(store, migrator)
    }

    pub fn with_migrator(store: Arc<CartStore<H>>, migrator: Migrator) -> Self {
        Self {
            store,
            migrator,
            current: Mutex::new(AuthState::SignedOut),
        }
    }

    pub fn current(&self) -> AuthState {
        self.current.lock().clone()
    }

    /// Handle an auth change. Returns the migration report on sign-in.
    ///
    /// Repeating the current state is a no-op. Switching users is a
    /// sign-out followed by a sign-in.
    pub async fn on_auth_change(&self, next: AuthState) -> ClientResult<Option<MigrationReport>> {
        let previous = std::mem::replace(&mut *self.current.lock(), next.clone());
        if previous == next {
            return Ok(None);
        }
        if previous.user_id().is_some() {
            self.sign_out()?;
        }

        match next {
            AuthState::SignedOut => Ok(None),
            AuthState::SignedIn { user_id, token } => {
                info!(%user_id, "Signed in");
                self.store.service().set_token(Some(token));
                let report = self.migrate().await;
                if let Err(e) = self.store.refresh().await {
                    warn!(error = %e, "Failed to load account cart after sign-in");
                }
                Ok(Some(report))
            }
        }
    }

    async fn migrate(&self) -> MigrationReport {
        let store = self.store.clone();
        let on_status =
            move |status: MigrationStatus| store.dispatch(CartAction::set_migration_status(status));
        let report = self
            .migrator
            .migrate_to_user_cart(self.store.service().is_authenticated(), &on_status)
            .await;

        if !report.errors.is_empty() {
            self.store.dispatch(CartAction::set_error(report.errors.join("\n")));
        }
        self.store
            .dispatch(CartAction::set_guest_cart(self.store.guest().items()));
        report
    }

    fn sign_out(&self) -> ClientResult<()> {
        info!("Signed out");
        let service = self.store.service();
        service.set_token(None);
        service.reset();
        self.store.dispatch(CartAction::set_cart(None));
        self.store
            .dispatch(CartAction::set_migration_status(MigrationStatus::Idle));
        self.store.guest().set_migrated(false)?;
        Ok(())
    }
}
