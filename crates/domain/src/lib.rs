pub mod errors;
pub mod identifiers;
pub mod service;
pub mod store;
pub mod todo;

pub use errors::*;
pub use identifiers::*;
pub use service::*;
pub use store::*;
pub use todo::*;
