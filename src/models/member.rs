use crate::entities::member_entity as members;
use crate::models::{IneligibleReason, SubscriptionResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateMemberRequest {
    #[schema(example = "Ama")]
    pub first_name: String,
    #[schema(example = "Mensah")]
    pub last_name: String,
    #[schema(example = "ama@example.com")]
    pub email: String,
    #[schema(example = "+233 55 310 3992")]
    pub phone: Option<String>,
    /// Optional plan to subscribe the new member to.
    pub plan_id: Option<i64>,
    /// Subscription start, defaults to now.
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MemberQuery {
    /// Matches first name, last name, email or phone, case-insensitive.
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<members::Model> for MemberResponse {
    fn from(m: members::Model) -> Self {
        Self {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberDetailResponse {
    pub member: MemberResponse,
    /// Newest first.
    pub subscriptions: Vec<SubscriptionResponse>,
    pub eligible_subscription: Option<SubscriptionResponse>,
    pub ineligible_reason: Option<IneligibleReason>,
}
