//! Verification domain: the state machine that turns a button press and an
//! OAuth callback into a role transition, and the platform it acts on.

pub use verify_auth::oauth::{PendingStore, PendingVerification};

pub mod error;
pub mod interaction;
pub mod platform;
pub mod role_set;
pub mod role_transition;
pub mod verification;

pub mod gateway;

#[cfg(any(test, feature = "mock"))]
pub mod test_support;
