//! OAuth 2.0 authorization-code infrastructure.
//!
//! Provides the pending-verification store correlating authorization requests with
//! their callbacks, and the identity provider abstraction used to redeem them.

mod provider;
mod state;
mod tokens;

pub mod providers;

pub use provider::{AuthorizationRequest, Provider, UserInfo};
pub use state::{Clock, ManualClock, PendingStore, PendingVerification, SystemClock};
pub use tokens::Tokens;
