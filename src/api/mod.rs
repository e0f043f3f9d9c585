pub mod delivery;
pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use delivery::{DeliveryError, deliver};
pub use middleware::log_request_errors;
pub use routes::{get_token, root, stream};
