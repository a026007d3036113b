use crate::entities::{plan_entity as plans, subscription_entity as subs};
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

#[derive(Clone)]
pub struct PlanService {
    pool: DatabaseConnection,
}

fn stored_counts(shape: PlanShape) -> (Option<i32>, Option<i32>) {
    let sessions = match shape.sessions {
        SessionShape::Limited(n) => Some(n),
        SessionShape::Unlimited => None,
    };
    let days = match shape.duration {
        DurationShape::Days(d) => Some(d),
        DurationShape::Unlimited => None,
    };
    (sessions, days)
}

impl PlanService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_plan(
        &self,
        operator: &Operator,
        req: CreatePlanRequest,
    ) -> AppResult<PlanResponse> {
        operator.require_admin()?;
        let shape = req.validate()?;
        let (session_count, duration_days) = stored_counts(shape);
        let now = Utc::now();

        let plan = plans::ActiveModel {
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            price_cents: Set(req.price_cents),
            duration_days: Set(duration_days),
            session_count: Set(session_count),
            is_unlimited_duration: Set(shape.is_unlimited_duration()),
            is_unlimited_sessions: Set(shape.is_unlimited_sessions()),
            is_active: Set(req.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Plan {} ({}) created by {}", plan.id, plan.name, operator.id);
        Ok(PlanResponse::from(plan))
    }

    pub async fn update_plan(
        &self,
        operator: &Operator,
        plan_id: i64,
        req: UpdatePlanRequest,
    ) -> AppResult<PlanResponse> {
        operator.require_admin()?;
        let current = self.find_plan(plan_id).await?;

        let name = req.name.unwrap_or_else(|| current.name.clone());
        let price_cents = req.price_cents.unwrap_or(current.price_cents);
        let session_count = req.session_count.or(current.session_count);
        let duration_days = req.duration_days.or(current.duration_days);
        if req.is_unlimited_sessions == Some(false) && session_count.is_none() {
            return Err(AppError::ValidationError(
                "Session count is required for a limited-session plan".to_string(),
            ));
        }
        if req.is_unlimited_duration == Some(false) && duration_days.is_none() {
            return Err(AppError::ValidationError(
                "Duration is required for a limited-duration plan".to_string(),
            ));
        }
        let shape = validate_plan_fields(
            &name,
            price_cents,
            PlanShape::new(
                session_count,
                duration_days,
                req.is_unlimited_sessions
                    .unwrap_or(current.is_unlimited_sessions),
                req.is_unlimited_duration
                    .unwrap_or(current.is_unlimited_duration),
            ),
        )?;
        let (session_count, duration_days) = stored_counts(shape);

        let mut am = current.into_active_model();
        am.name = Set(name.trim().to_string());
        am.price_cents = Set(price_cents);
        am.session_count = Set(session_count);
        am.duration_days = Set(duration_days);
        am.is_unlimited_sessions = Set(shape.is_unlimited_sessions());
        am.is_unlimited_duration = Set(shape.is_unlimited_duration());
        if let Some(description) = req.description {
            am.description = Set(Some(description));
        }
        if let Some(active) = req.is_active {
            am.is_active = Set(active);
        }
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;

        Ok(PlanResponse::from(updated))
    }

    pub async fn get_plan(&self, plan_id: i64) -> AppResult<PlanResponse> {
        Ok(PlanResponse::from(self.find_plan(plan_id).await?))
    }

    pub async fn list_plans(&self, query: &PlanQuery) -> AppResult<Vec<PlanResponse>> {
        let mut select = plans::Entity::find();
        if query.active_only.unwrap_or(false) {
            select = select.filter(plans::Column::IsActive.eq(true));
        }
        let rows = select
            .order_by_asc(plans::Column::PriceCents)
            .order_by_asc(plans::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PlanResponse::from).collect())
    }

    /// Plans with subscription history can only be deactivated.
    pub async fn delete_plan(&self, operator: &Operator, plan_id: i64) -> AppResult<()> {
        operator.require_admin()?;
        let plan = self.find_plan(plan_id).await?;

        let in_use = subs::Entity::find()
            .filter(subs::Column::PlanId.eq(plan_id))
            .count(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(AppError::ValidationError(
                "Plan has subscriptions, deactivate it instead".to_string(),
            ));
        }

        plans::Entity::delete_by_id(plan.id).exec(&self.pool).await?;
        log::info!("Plan {plan_id} deleted by {}", operator.id);
        Ok(())
    }

    async fn find_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        plans::Entity::find_by_id(plan_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
    }
}
