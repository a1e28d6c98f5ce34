//! SET_LOADING, SET_ERROR and SET_MIGRATION_STATUS appliers

use crate::reducer::{CartApplier, CartState, MigrationStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct SetLoading {
    pub loading: bool,
}

impl CartApplier for SetLoading {
    fn apply(&self, state: &mut CartState) {
        state.is_loading = self.loading;
    }
}

/// Record (or clear) a user-visible error. Always ends loading.
#[derive(Debug, Clone, PartialEq)]
pub struct SetError {
    pub error: Option<String>,
}

impl CartApplier for SetError {
    fn apply(&self, state: &mut CartState) {
        state.error = self.error.clone();
        state.is_loading = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetMigrationStatus {
    pub status: MigrationStatus,
}

impl CartApplier for SetMigrationStatus {
    fn apply(&self, state: &mut CartState) {
        state.migration_status = self.status;
    }
}
