//! Campus Transit — account onboarding and approval core.

pub mod admin;
pub mod config;
pub mod error;
pub mod identity;
pub mod onboarding;
pub mod server;
pub mod store;
