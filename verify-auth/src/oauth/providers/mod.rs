//! Concrete identity provider implementations.

pub mod discord;
