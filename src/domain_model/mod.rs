mod field;
mod relation;
mod unit;
mod user;

pub use field::*;
pub use relation::*;
pub use unit::*;
pub use user::*;
