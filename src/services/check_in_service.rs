use crate::entities::{
    member_entity as members, plan_entity as plans, session_entity as sessions,
    subscription_entity as subs,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::eligibility::{Eligibility, check_subscription, find_eligible_subscription};
use crate::services::member_service::search_condition;
use crate::services::notification_service::enqueue_notification;
use crate::services::subscription_service::load_member_subscriptions;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// Takes one session off `subscription_id`, guarded in the `UPDATE` itself.
///
/// Limited plans only decrement while `remaining_sessions > 0`; every plan
/// requires the row to still be active. A row that no longer qualifies
/// (another desk took the last session, or the plan was changed) fails
/// without writing.
pub(crate) async fn consume_session<C: ConnectionTrait>(
    conn: &C,
    subscription_id: i64,
    shape: PlanShape,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let mut update = subs::Entity::update_many()
        .col_expr(subs::Column::UpdatedAt, Expr::value(now))
        .filter(subs::Column::Id.eq(subscription_id))
        .filter(subs::Column::IsActive.eq(true));
    if !shape.is_unlimited_sessions() {
        update = update
            .col_expr(
                subs::Column::RemainingSessions,
                Expr::col(subs::Column::RemainingSessions).sub(1),
            )
            .filter(subs::Column::RemainingSessions.gt(0));
    }
    let affected = update.exec(conn).await?.rows_affected;
    if affected == 0 {
        return Err(if shape.is_unlimited_sessions() {
            AppError::NoEligibleSubscription(IneligibleReason::Inactive)
        } else {
            AppError::SessionsExhausted
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct CheckInService {
    pool: DatabaseConnection,
}

impl CheckInService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Finds the first member matching `search_term` and what they could check in against.
    pub async fn lookup(
        &self,
        req: CheckInLookupRequest,
        now: DateTime<Utc>,
    ) -> AppResult<CheckInLookupResponse> {
        let term = req.search_term.trim();
        if term.is_empty() {
            return Err(AppError::ValidationError(
                "Search term is required".to_string(),
            ));
        }

        let member = members::Entity::find()
            .filter(search_condition(term))
            .order_by_asc(members::Column::Id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("No member matches your search".to_string()))?;

        let subscriptions = load_member_subscriptions(&self.pool, member.id).await?;
        let (eligible_subscription, ineligible_reason) =
            match find_eligible_subscription(&subscriptions, now) {
                Eligibility::Eligible(s) => (Some(SubscriptionResponse::from(s)), None),
                Eligibility::Ineligible(reason) => (None, Some(reason)),
            };

        Ok(CheckInLookupResponse {
            member: MemberResponse::from(member),
            eligible_subscription,
            message: ineligible_reason.map(|r| r.operator_message().to_string()),
            ineligible_reason,
        })
    }

    /// Consumes one session of `subscription_id` and records the visit.
    ///
    /// Eligibility is re-checked inside the transaction and the decrement is
    /// conditional on `remaining_sessions > 0`, so two concurrent check-ins
    /// against the last session yield one success and one `SessionsExhausted`.
    pub async fn check_in(
        &self,
        operator: &Operator,
        member_id: i64,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<CheckInResponse> {
        let txn = self.pool.begin().await?;

        let (sub, plan) = match subs::Entity::find_by_id(subscription_id)
            .find_also_related(plans::Entity)
            .one(&txn)
            .await?
        {
            Some((sub, Some(plan))) if sub.member_id == member_id => (sub, plan),
            _ => {
                return Err(AppError::NotFound(
                    "Subscription not found for this member".to_string(),
                ));
            }
        };
        let member = members::Entity::find_by_id(member_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        let current = SubscriptionWithPlan::new(sub, plan);
        if let Err(reason) = check_subscription(&current, now) {
            return Err(match reason {
                IneligibleReason::Exhausted => AppError::SessionsExhausted,
                other => AppError::NoEligibleSubscription(other),
            });
        }

        let shape = current.shape();
        consume_session(&txn, subscription_id, shape, now).await?;

        let updated = subs::Entity::find_by_id(subscription_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::InternalError("Subscription vanished mid check-in".into()))?;
        let allowance = shape.allowance(updated.remaining_sessions);

        let session = sessions::ActiveModel {
            subscription_id: Set(subscription_id),
            member_id: Set(member_id),
            check_in_time: Set(now),
            recorded_by: Set(Some(operator.id.clone())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let notification = Notification::check_in(
            member.full_name(),
            member.email.clone(),
            current.plan.name.clone(),
            allowance,
        );
        enqueue_notification(&txn, member_id, &notification, now).await?;

        txn.commit().await?;

        log::info!(
            "Member {member_id} checked in on subscription {subscription_id} by {} ({allowance:?})",
            operator.id
        );

        Ok(CheckInResponse {
            session_id: session.id,
            subscription_id,
            member_id,
            allowance,
            checked_in_at: now,
        })
    }

    pub async fn member_sessions(
        &self,
        member_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<SessionResponse>> {
        let query = sessions::Entity::find().filter(sessions::Column::MemberId.eq(member_id));
        let total = query.clone().count(&self.pool).await?;
        let rows = query
            .order_by_desc(sessions::Column::CheckInTime)
            .order_by_desc(sessions::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items = rows.into_iter().map(SessionResponse::from).collect();
        Ok(PaginatedResponse::new(items, params, total))
    }
}
