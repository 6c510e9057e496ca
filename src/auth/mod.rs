/// Signed token issuance and verification.
pub mod token;

/// Method-level role-based access control.
pub mod policy;

/// In-memory user registry with hashed passwords.
pub mod users;

pub use policy::{AccessPolicy, MethodAccess};
pub use token::{Claims, Role, TokenAuthority};
pub use users::{User, UserRegistry};
