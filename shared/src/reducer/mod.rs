//! Cart reducer
//!
//! `reduce(state, action) -> state` over the closed [`CartAction`] set.
//! Each action is handled by its own applier (see [`appliers`]); the
//! appliers are PURE: no I/O, no clock reads, no randomness. Network
//! calls happen in the caller before or after dispatch.
//!
//! ```text
//! intent ──▶ CartAction ──▶ reduce ──▶ CartState
//!                 ▲                        │
//!                 └── SetCart / Revert ◀── network result
//! ```

use enum_dispatch::enum_dispatch;

/// A single state transition
#[enum_dispatch]
pub trait CartApplier {
    fn apply(&self, state: &mut CartState);
}

pub mod appliers;
mod state;

pub use appliers::CartAction;
pub use state::{CartState, CartTarget, MigrationStatus};

/// Apply one action to a state, returning the next state
pub fn reduce(state: &CartState, action: &CartAction) -> CartState {
    let mut next = state.clone();
    action.apply(&mut next);
    next
}
