//! Builders shared by the service tests.

use crate::database::DbPool;
use crate::entities::{member_entity as members, plan_entity as plans, subscription_entity as subs};
use crate::models::CreatePlanRequest;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};

pub fn limited_plan(name: &str, sessions: i32, days: i32) -> CreatePlanRequest {
    CreatePlanRequest {
        name: name.to_string(),
        description: None,
        price_cents: 10_000,
        duration_days: Some(days),
        session_count: Some(sessions),
        is_unlimited_duration: false,
        is_unlimited_sessions: false,
        is_active: Some(true),
    }
}

pub fn unlimited_sessions_plan(name: &str, days: i32) -> CreatePlanRequest {
    CreatePlanRequest {
        is_unlimited_sessions: true,
        session_count: None,
        ..limited_plan(name, 1, days)
    }
}

pub async fn seed_member(db: &DbPool, first_name: &str, email: &str) -> members::Model {
    let now = Utc::now();
    members::ActiveModel {
        first_name: Set(first_name.to_string()),
        last_name: Set("Mensah".to_string()),
        email: Set(email.to_string()),
        phone: Set(Some("0553103992".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_plan(
    db: &DbPool,
    session_count: Option<i32>,
    is_unlimited_sessions: bool,
    is_unlimited_duration: bool,
) -> plans::Model {
    let now = Utc::now();
    plans::ActiveModel {
        name: Set("Test plan".to_string()),
        description: Set(None),
        price_cents: Set(5_000),
        duration_days: Set(Some(30)),
        session_count: Set(session_count),
        is_unlimited_duration: Set(is_unlimited_duration),
        is_unlimited_sessions: Set(is_unlimited_sessions),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_subscription(
    db: &DbPool,
    member_id: i64,
    plan: &plans::Model,
    remaining_sessions: i32,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
) -> subs::Model {
    let now = Utc::now();
    subs::ActiveModel {
        member_id: Set(member_id),
        plan_id: Set(plan.id),
        start_date: Set(now),
        end_date: Set(end_date),
        remaining_sessions: Set(remaining_sessions),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
