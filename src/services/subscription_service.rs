use crate::entities::{
    member_entity as members, plan_entity as plans, subscription_entity as subs,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// All subscriptions of a member joined to their plans, newest first.
pub async fn load_member_subscriptions<C: ConnectionTrait>(
    conn: &C,
    member_id: i64,
) -> AppResult<Vec<SubscriptionWithPlan>> {
    let rows = subs::Entity::find()
        .filter(subs::Column::MemberId.eq(member_id))
        .find_also_related(plans::Entity)
        .order_by_desc(subs::Column::CreatedAt)
        .order_by_desc(subs::Column::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(sub, plan)| match plan {
            Some(plan) => Some(SubscriptionWithPlan::new(sub, plan)),
            None => {
                log::warn!("Subscription {} points at a missing plan", sub.id);
                None
            }
        })
        .collect())
}

/// Loads an active, assignable plan.
pub(crate) async fn find_assignable_plan<C: ConnectionTrait>(
    conn: &C,
    plan_id: i64,
) -> AppResult<plans::Model> {
    let plan = plans::Entity::find_by_id(plan_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;
    if !plan.is_active {
        return Err(AppError::ValidationError(
            "Plan is not active".to_string(),
        ));
    }
    Ok(plan)
}

/// Inserts a fresh active subscription for `plan` starting at `start`.
pub(crate) async fn open_subscription<C: ConnectionTrait>(
    conn: &C,
    member_id: i64,
    plan: &plans::Model,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<subs::Model> {
    let shape = PlanShape::from(plan);
    let sub = subs::ActiveModel {
        member_id: Set(member_id),
        plan_id: Set(plan.id),
        start_date: Set(start),
        end_date: Set(shape.end_date_from(start)?),
        remaining_sessions: Set(shape.initial_sessions()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(sub)
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DatabaseConnection,
}

impl SubscriptionService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Moves a member onto `plan_id`.
    ///
    /// Every currently active subscription of the member is deactivated and
    /// the new one inserted in the same transaction, so a failure leaves the
    /// previous subscription untouched.
    pub async fn change_plan(
        &self,
        operator: &Operator,
        member_id: i64,
        req: ChangePlanRequest,
    ) -> AppResult<SubscriptionResponse> {
        let now = Utc::now();
        let start = req.start_date.unwrap_or(now);

        let txn = self.pool.begin().await?;

        members::Entity::find_by_id(member_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
        let plan = find_assignable_plan(&txn, req.plan_id).await?;

        let deactivated = subs::Entity::update_many()
            .col_expr(subs::Column::IsActive, Expr::value(false))
            .col_expr(subs::Column::UpdatedAt, Expr::value(now))
            .filter(subs::Column::MemberId.eq(member_id))
            .filter(subs::Column::IsActive.eq(true))
            .exec(&txn)
            .await?
            .rows_affected;
        if deactivated > 1 {
            log::warn!("Member {member_id} had {deactivated} active subscriptions before plan change");
        }

        let sub = open_subscription(&txn, member_id, &plan, start, now).await?;
        txn.commit().await?;

        log::info!(
            "Member {member_id} moved to plan {} (subscription {}) by {}",
            plan.id,
            sub.id,
            operator.id
        );
        Ok(SubscriptionResponse::from(&SubscriptionWithPlan::new(sub, plan)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::services::eligibility::find_eligible_subscription;
    use crate::services::test_support::*;
    use chrono::Duration;
    use sea_orm::{IntoActiveModel, PaginatorTrait};

    async fn deactivate_plan(db: &crate::database::DbPool, plan: plans::Model) -> plans::Model {
        let mut am = plan.into_active_model();
        am.is_active = Set(false);
        am.update(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_change_plan_then_eligible_is_new_subscription() {
        let db = test_pool().await;
        let member = seed_member(&db, "Ama", "ama@example.com").await;
        let old_plan = seed_plan(&db, Some(8), false, false).await;
        let new_plan = seed_plan(&db, Some(12), false, false).await;
        let old = seed_subscription(
            &db,
            member.id,
            &old_plan,
            5,
            Some(Utc::now() + Duration::days(10)),
            true,
        )
        .await;

        let svc = SubscriptionService::new(db.clone());
        let created = svc
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: new_plan.id,
                    start_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.allowance, SessionAllowance::Limited { remaining: 12 });
        assert!(created.end_date.is_some());

        let all = load_member_subscriptions(&db, member.id).await.unwrap();
        let found = find_eligible_subscription(&all, Utc::now());
        assert_eq!(
            found.subscription().map(|s| s.subscription.id),
            Some(created.id)
        );
        let previous = all.iter().find(|s| s.subscription.id == old.id).unwrap();
        assert!(!previous.subscription.is_active);
    }

    #[tokio::test]
    async fn test_change_plan_to_unlimited_plan() {
        let db = test_pool().await;
        let member = seed_member(&db, "Kofi", "kofi@example.com").await;
        let plan = seed_plan(&db, None, true, true).await;

        let created = SubscriptionService::new(db.clone())
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: plan.id,
                    start_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.allowance, SessionAllowance::Unlimited);
        assert_eq!(created.end_date, None);

        let stored = subs::Entity::find_by_id(created.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.remaining_sessions, UNLIMITED_SESSIONS_SENTINEL);
    }

    #[tokio::test]
    async fn test_failed_change_keeps_previous_subscription_active() {
        let db = test_pool().await;
        let member = seed_member(&db, "Esi", "esi@example.com").await;
        let plan = seed_plan(&db, Some(8), false, false).await;
        let old = seed_subscription(&db, member.id, &plan, 3, None, true).await;

        let err = SubscriptionService::new(db.clone())
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: 9_999,
                    start_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let stored = subs::Entity::find_by_id(old.id).one(&db).await.unwrap().unwrap();
        assert!(stored.is_active);
        let count = subs::Entity::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_change_plan_repairs_multiple_active_rows() {
        let db = test_pool().await;
        let member = seed_member(&db, "Yaw", "yaw@example.com").await;
        let plan = seed_plan(&db, Some(8), false, false).await;
        seed_subscription(&db, member.id, &plan, 3, None, true).await;
        seed_subscription(&db, member.id, &plan, 4, None, true).await;

        SubscriptionService::new(db.clone())
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: plan.id,
                    start_date: None,
                },
            )
            .await
            .unwrap();

        let active = subs::Entity::find()
            .filter(subs::Column::MemberId.eq(member.id))
            .filter(subs::Column::IsActive.eq(true))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn test_change_plan_to_inactive_plan_is_rejected() {
        let db = test_pool().await;
        let member = seed_member(&db, "Akua", "akua@example.com").await;
        let current = seed_plan(&db, Some(8), false, false).await;
        let retired = seed_plan(&db, Some(12), false, false).await;
        let retired = deactivate_plan(&db, retired).await;
        let old = seed_subscription(&db, member.id, &current, 3, None, true).await;

        let err = SubscriptionService::new(db.clone())
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: retired.id,
                    start_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let stored = subs::Entity::find_by_id(old.id).one(&db).await.unwrap().unwrap();
        assert!(stored.is_active);
        assert_eq!(subs::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_change_plan_with_out_of_range_start_is_rejected() {
        let db = test_pool().await;
        let member = seed_member(&db, "Kwame", "kwame@example.com").await;
        let plan = seed_plan(&db, Some(8), false, false).await;
        let old = seed_subscription(&db, member.id, &plan, 3, None, true).await;

        let err = SubscriptionService::new(db.clone())
            .change_plan(
                &Operator::staff("desk-1"),
                member.id,
                ChangePlanRequest {
                    plan_id: plan.id,
                    start_date: Some(DateTime::<Utc>::MAX_UTC - Duration::days(1)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let stored = subs::Entity::find_by_id(old.id).one(&db).await.unwrap().unwrap();
        assert!(stored.is_active);
    }
}
