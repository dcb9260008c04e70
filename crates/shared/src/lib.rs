pub mod auth;
pub mod config;
pub mod tracing;

pub use self::auth::*;
pub use self::config::*;
pub use self::tracing::*;
