//! Administrative account management — reviewing and approving sign-ups.

pub mod approval;
pub mod routes;

pub use approval::AccountAdmin;
pub use routes::{AdminRouteState, admin_routes};
