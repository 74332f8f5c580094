//! # verify-auth
//!
//! Authentication plumbing for the member verification flow:
//! - Pending-verification store correlating OAuth `state` tokens with members
//! - OAuth 2.0 identity provider abstraction and the Discord implementation
//! - Bot-authenticated HTTP client building with retry middleware
//! - Interaction webhook signature validation
//!
//! ## Architecture
//!
//! This crate provides the authentication foundation that other crates build upon:
//! - `domain` drives the verification state machine with the store and provider
//! - `web` validates inbound interaction signatures before dispatching them
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verify_auth::{
//!     bot::BotTokenAuth,
//!     oauth::{PendingStore, Provider, providers::discord},
//!     http::AuthenticatedClientBuilder,
//! };
//! ```

pub mod bot;
pub mod error;
pub mod http;
pub mod oauth;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
