use crate::entities::{plan_entity as plans, subscription_entity as subs};
use crate::models::{PlanShape, SessionAllowance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A subscription joined to the plan it was created from.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionWithPlan {
    pub subscription: subs::Model,
    pub plan: plans::Model,
}

impl SubscriptionWithPlan {
    pub fn new(subscription: subs::Model, plan: plans::Model) -> Self {
        Self { subscription, plan }
    }

    pub fn shape(&self) -> PlanShape {
        PlanShape::from(&self.plan)
    }

    pub fn allowance(&self) -> SessionAllowance {
        self.shape().allowance(self.subscription.remaining_sessions)
    }
}

/// Why a member cannot check in right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    /// The member has no subscriptions at all.
    NeverSubscribed,
    /// Every subscription has been deactivated.
    Inactive,
    /// Active subscriptions exist but all of them are past their end date.
    Expired,
    /// An active, unexpired subscription exists but has no sessions left.
    Exhausted,
}

impl IneligibleReason {
    pub fn operator_message(&self) -> &'static str {
        match self {
            IneligibleReason::NeverSubscribed => "Member has no membership plan",
            IneligibleReason::Inactive => "No active membership found",
            IneligibleReason::Expired => "Membership has expired, please renew",
            IneligibleReason::Exhausted => "No sessions remaining, please renew membership",
        }
    }
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibleReason::NeverSubscribed => write!(f, "never_subscribed"),
            IneligibleReason::Inactive => write!(f, "inactive"),
            IneligibleReason::Expired => write!(f, "expired"),
            IneligibleReason::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePlanRequest {
    pub plan_id: i64,
    /// Defaults to now.
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: i64,
    pub member_id: i64,
    pub plan_id: i64,
    pub plan_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub allowance: SessionAllowance,
    pub is_unlimited_duration: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&SubscriptionWithPlan> for SubscriptionResponse {
    fn from(s: &SubscriptionWithPlan) -> Self {
        let shape = s.shape();
        Self {
            id: s.subscription.id,
            member_id: s.subscription.member_id,
            plan_id: s.plan.id,
            plan_name: s.plan.name.clone(),
            start_date: s.subscription.start_date,
            end_date: s.subscription.end_date,
            allowance: shape.allowance(s.subscription.remaining_sessions),
            is_unlimited_duration: shape.is_unlimited_duration(),
            is_active: s.subscription.is_active,
            created_at: s.subscription.created_at,
        }
    }
}
