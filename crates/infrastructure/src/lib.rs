pub mod dynamodb;
pub mod memory;
pub mod models;
pub mod seed;
pub mod todo_repository;

pub use dynamodb::*;
pub use memory::*;
pub use models::*;
pub use seed::*;
pub use todo_repository::*;
