//! Onboarding system — account sign-up and approval flow.
//!
//! A signed-in identity is routed through four steps: sign in, complete the
//! profile, wait for approval, approved. The manager performs the account
//! store writes and identity-provider calls; `state` holds the pure routing
//! rules so they can be tested without a store.

pub mod manager;
pub mod model;
pub mod routes;
pub mod state;

pub use manager::{FlowEvent, Notice, NoticeLevel, OnboardingManager, Transition};
pub use model::{AccountRecord, AccountStatus, Partition, ProfileDetails, ProfileForm};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingStep, route_existing};
