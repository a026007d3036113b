pub mod check_in_service;
pub mod eligibility;
pub mod member_service;
pub mod notification_service;
pub mod plan_service;
pub mod subscription_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use check_in_service::*;
pub use eligibility::*;
pub use member_service::*;
pub use notification_service::*;
pub use plan_service::*;
pub use subscription_service::*;
