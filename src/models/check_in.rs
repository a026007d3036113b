use crate::entities::session_entity as sessions;
use crate::models::{IneligibleReason, MemberResponse, SessionAllowance, SubscriptionResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInLookupRequest {
    #[schema(example = "mensah")]
    pub search_term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInLookupResponse {
    pub member: MemberResponse,
    pub eligible_subscription: Option<SubscriptionResponse>,
    pub ineligible_reason: Option<IneligibleReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRequest {
    pub member_id: i64,
    pub subscription_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInResponse {
    pub session_id: i64,
    pub subscription_id: i64,
    pub member_id: i64,
    pub allowance: SessionAllowance,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: i64,
    pub subscription_id: i64,
    pub check_in_time: DateTime<Utc>,
    pub recorded_by: Option<String>,
}

impl From<sessions::Model> for SessionResponse {
    fn from(s: sessions::Model) -> Self {
        Self {
            id: s.id,
            subscription_id: s.subscription_id,
            check_in_time: s.check_in_time,
            recorded_by: s.recorded_by,
        }
    }
}
