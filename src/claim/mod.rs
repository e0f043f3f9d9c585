pub mod error;
pub mod issuer;
pub mod key;
pub mod payload;
pub mod validator;

// Internal modules
mod header;

// Re-export public types and functions
pub use error::{IssueError, TokenError};
pub use issuer::{AccessToken, TokenIssuer};
pub use key::{KeyMaterial, SigningKey};
pub use payload::Claims;
pub use validator::TokenValidator;
