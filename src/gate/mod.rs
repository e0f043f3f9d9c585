pub mod context;
pub mod middleware;
pub mod policy;

// Re-export public types and functions
pub use context::{Access, Authorized, GateError};
pub use middleware::{AccessGate, access_gate};
pub use policy::{ExemptionPolicy, ExemptionRule, ExemptionScope, PathPattern};
