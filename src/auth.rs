pub mod password;
pub mod session;

pub use password::{PasswordHasher, verify_password};
pub use session::SessionStore;
