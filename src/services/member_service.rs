use crate::entities::{
    member_entity as members, outbox_entity as outbox, session_entity as sessions,
    subscription_entity as subs,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::eligibility::{Eligibility, find_eligible_subscription};
use crate::services::subscription_service::{
    find_assignable_plan, load_member_subscriptions, open_subscription,
};
use crate::utils::{normalize_email, normalize_phone};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

const LIKE_ESCAPE: char = '\\';

/// `%` and `_` in the operator's input match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match over name, email and phone.
pub(crate) fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(&term.trim().to_lowercase()));
    [
        members::Column::FirstName,
        members::Column::LastName,
        members::Column::Email,
        members::Column::Phone,
    ]
    .into_iter()
    .fold(Condition::any(), |cond, col| {
        cond.add(
            Expr::expr(Func::lower(Expr::col(col)))
                .like(LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE)),
        )
    })
}

fn required_name(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(value.to_string())
}

async fn ensure_email_free<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except_member: Option<i64>,
) -> AppResult<()> {
    let mut query = members::Entity::find().filter(members::Column::Email.eq(email));
    if let Some(id) = except_member {
        query = query.filter(members::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(AppError::ValidationError(
            "Email is already registered".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MemberService {
    pool: DatabaseConnection,
}

impl MemberService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Creates a member and, when a plan is given, their first subscription.
    pub async fn register_member(
        &self,
        operator: &Operator,
        req: CreateMemberRequest,
    ) -> AppResult<MemberDetailResponse> {
        let first_name = required_name(&req.first_name, "First name")?;
        let last_name = required_name(&req.last_name, "Last name")?;
        let email = normalize_email(&req.email)?;
        let phone = req.phone.as_deref().map(normalize_phone).transpose()?;
        let now = Utc::now();

        let txn = self.pool.begin().await?;
        ensure_email_free(&txn, &email, None).await?;

        let member = members::ActiveModel {
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone: Set(phone),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(plan_id) = req.plan_id {
            let plan = find_assignable_plan(&txn, plan_id).await?;
            let start = req.start_date.unwrap_or(now);
            open_subscription(&txn, member.id, &plan, start, now).await?;
        }
        txn.commit().await?;

        log::info!("Member {} registered by {}", member.id, operator.id);
        self.get_member(member.id, now).await
    }

    pub async fn get_member(
        &self,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<MemberDetailResponse> {
        let member = members::Entity::find_by_id(member_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
        let subscriptions = load_member_subscriptions(&self.pool, member_id).await?;

        let (eligible_subscription, ineligible_reason) =
            match find_eligible_subscription(&subscriptions, now) {
                Eligibility::Eligible(s) => (Some(SubscriptionResponse::from(s)), None),
                Eligibility::Ineligible(reason) => (None, Some(reason)),
            };

        Ok(MemberDetailResponse {
            member: MemberResponse::from(member),
            subscriptions: subscriptions.iter().map(SubscriptionResponse::from).collect(),
            eligible_subscription,
            ineligible_reason,
        })
    }

    pub async fn list_members(
        &self,
        query: &MemberQuery,
    ) -> AppResult<PaginatedResponse<MemberResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = members::Entity::find();
        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            select = select.filter(search_condition(term));
        }

        let total = select.clone().count(&self.pool).await?;
        let rows = select
            .order_by_desc(members::Column::CreatedAt)
            .order_by_desc(members::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items = rows.into_iter().map(MemberResponse::from).collect();
        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn update_member(
        &self,
        operator: &Operator,
        member_id: i64,
        req: UpdateMemberRequest,
    ) -> AppResult<MemberResponse> {
        if req.first_name.is_none()
            && req.last_name.is_none()
            && req.email.is_none()
            && req.phone.is_none()
        {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        let mut am = members::Entity::find_by_id(member_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?
            .into_active_model();

        if let Some(first_name) = &req.first_name {
            am.first_name = Set(required_name(first_name, "First name")?);
        }
        if let Some(last_name) = &req.last_name {
            am.last_name = Set(required_name(last_name, "Last name")?);
        }
        if let Some(email) = &req.email {
            let email = normalize_email(email)?;
            ensure_email_free(&self.pool, &email, Some(member_id)).await?;
            am.email = Set(email);
        }
        if let Some(phone) = &req.phone {
            am.phone = Set(Some(normalize_phone(phone)?));
        }
        am.updated_at = Set(Utc::now());

        let updated = am.update(&self.pool).await?;
        log::info!("Member {member_id} updated by {}", operator.id);
        Ok(MemberResponse::from(updated))
    }

    /// Removes a member with its check-ins, subscriptions and queued mail.
    pub async fn delete_member(&self, operator: &Operator, member_id: i64) -> AppResult<()> {
        operator.require_admin()?;
        let txn = self.pool.begin().await?;

        sessions::Entity::delete_many()
            .filter(sessions::Column::MemberId.eq(member_id))
            .exec(&txn)
            .await?;
        subs::Entity::delete_many()
            .filter(subs::Column::MemberId.eq(member_id))
            .exec(&txn)
            .await?;
        outbox::Entity::delete_many()
            .filter(outbox::Column::MemberId.eq(member_id))
            .filter(outbox::Column::Status.eq(outbox::STATUS_PENDING))
            .exec(&txn)
            .await?;
        let deleted = members::Entity::delete_by_id(member_id)
            .exec(&txn)
            .await?
            .rows_affected;
        if deleted == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        txn.commit().await?;
        log::info!("Member {member_id} deleted by {}", operator.id);
        Ok(())
    }
}
