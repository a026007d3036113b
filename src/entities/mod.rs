pub mod members;
pub mod membership_plans;
pub mod notification_outbox;
pub mod sessions;
pub mod subscriptions;

pub use members as member_entity;
pub use membership_plans as plan_entity;
pub use notification_outbox as outbox_entity;
pub use sessions as session_entity;
pub use subscriptions as subscription_entity;
