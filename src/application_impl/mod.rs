mod auth_service_impl;
mod relation_resolver_impl;
mod relationship_service_impl;
mod user_service_impl;

#[cfg(test)]
mod test_support;

pub use auth_service_impl::*;
pub use relation_resolver_impl::*;
pub use relationship_service_impl::*;
pub use user_service_impl::*;
