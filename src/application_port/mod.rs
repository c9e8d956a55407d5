mod auth_service;
mod relation_resolver;
mod relationship_service;
mod user_service;

pub use auth_service::*;
pub use relation_resolver::*;
pub use relationship_service::*;
pub use user_service::*;
