pub mod jwt;
pub mod phone;

pub use jwt::*;
pub use phone::*;
