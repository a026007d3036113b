pub mod check_in;
pub mod common;
pub mod member;
pub mod notification;
pub mod operator;
pub mod pagination;
pub mod plan;
pub mod subscription;

pub use check_in::*;
pub use common::*;
pub use member::*;
pub use notification::*;
pub use operator::*;
pub use pagination::*;
pub use plan::*;
pub use subscription::*;
