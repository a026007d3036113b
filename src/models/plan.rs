use crate::entities::plan_entity as plans;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored in `remaining_sessions` for unlimited-session plans. Never decremented.
pub const UNLIMITED_SESSIONS_SENTINEL: i32 = 9999;

/// Longest duration a limited-duration plan may have.
pub const MAX_DURATION_DAYS: i32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionShape {
    Limited(i32),
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationShape {
    Days(i32),
    Unlimited,
}

/// Normalized view of a plan row.
///
/// Older rows mark unlimited plans only by leaving `session_count` or
/// `duration_days` empty, newer rows set the explicit flags. Both mean the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanShape {
    pub sessions: SessionShape,
    pub duration: DurationShape,
}

impl PlanShape {
    pub fn new(
        session_count: Option<i32>,
        duration_days: Option<i32>,
        is_unlimited_sessions: bool,
        is_unlimited_duration: bool,
    ) -> Self {
        let sessions = match session_count {
            Some(n) if !is_unlimited_sessions => SessionShape::Limited(n),
            _ => SessionShape::Unlimited,
        };
        let duration = match duration_days {
            Some(d) if !is_unlimited_duration => DurationShape::Days(d),
            _ => DurationShape::Unlimited,
        };
        Self { sessions, duration }
    }

    pub fn is_unlimited_sessions(&self) -> bool {
        self.sessions == SessionShape::Unlimited
    }

    pub fn is_unlimited_duration(&self) -> bool {
        self.duration == DurationShape::Unlimited
    }

    /// `remaining_sessions` for a fresh subscription.
    pub fn initial_sessions(&self) -> i32 {
        match self.sessions {
            SessionShape::Limited(n) => n,
            SessionShape::Unlimited => UNLIMITED_SESSIONS_SENTINEL,
        }
    }

    /// `end_date` for a subscription starting at `start`.
    pub fn end_date_from(&self, start: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
        match self.duration {
            DurationShape::Days(d) => start
                .checked_add_signed(Duration::days(d as i64))
                .map(Some)
                .ok_or_else(|| {
                    AppError::ValidationError("Subscription end date is out of range".to_string())
                }),
            DurationShape::Unlimited => Ok(None),
        }
    }

    /// What the operator sees for a subscription of this plan.
    pub fn allowance(&self, remaining_sessions: i32) -> SessionAllowance {
        match self.sessions {
            SessionShape::Limited(_) => SessionAllowance::Limited {
                remaining: remaining_sessions,
            },
            SessionShape::Unlimited => SessionAllowance::Unlimited,
        }
    }

    fn validate(&self) -> AppResult<()> {
        if let SessionShape::Limited(n) = self.sessions
            && n < 1
        {
            return Err(AppError::ValidationError(
                "Session count must be at least 1 for limited plans".to_string(),
            ));
        }
        if let DurationShape::Days(d) = self.duration
            && !(1..=MAX_DURATION_DAYS).contains(&d)
        {
            return Err(AppError::ValidationError(format!(
                "Duration must be between 1 and {MAX_DURATION_DAYS} days for limited plans"
            )));
        }
        Ok(())
    }
}

impl From<&plans::Model> for PlanShape {
    fn from(plan: &plans::Model) -> Self {
        PlanShape::new(
            plan.session_count,
            plan.duration_days,
            plan.is_unlimited_sessions,
            plan.is_unlimited_duration,
        )
    }
}

/// Remaining session count as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionAllowance {
    Limited { remaining: i32 },
    Unlimited,
}

impl SessionAllowance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, SessionAllowance::Unlimited)
    }

    pub fn remaining(&self) -> Option<i32> {
        match self {
            SessionAllowance::Limited { remaining } => Some(*remaining),
            SessionAllowance::Unlimited => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    #[schema(example = "8 Sessions")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 25000)]
    pub price_cents: i64,
    #[schema(example = 30)]
    pub duration_days: Option<i32>,
    #[schema(example = 8)]
    pub session_count: Option<i32>,
    #[serde(default)]
    pub is_unlimited_duration: bool,
    #[serde(default)]
    pub is_unlimited_sessions: bool,
    pub is_active: Option<bool>,
}

impl CreatePlanRequest {
    pub fn validate(&self) -> AppResult<PlanShape> {
        validate_plan_fields(
            &self.name,
            self.price_cents,
            PlanShape::new(
                self.session_count,
                self.duration_days,
                self.is_unlimited_sessions,
                self.is_unlimited_duration,
            ),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_days: Option<i32>,
    pub session_count: Option<i32>,
    pub is_unlimited_duration: Option<bool>,
    pub is_unlimited_sessions: Option<bool>,
    pub is_active: Option<bool>,
}

pub(crate) fn validate_plan_fields(
    name: &str,
    price_cents: i64,
    shape: PlanShape,
) -> AppResult<PlanShape> {
    if name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Plan name is required".to_string(),
        ));
    }
    if price_cents < 0 {
        return Err(AppError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    shape.validate()?;
    Ok(shape)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PlanQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// `None` when the plan never expires.
    pub duration_days: Option<i32>,
    /// `None` when sessions are unlimited.
    pub session_count: Option<i32>,
    pub is_unlimited_duration: bool,
    pub is_unlimited_sessions: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<plans::Model> for PlanResponse {
    fn from(p: plans::Model) -> Self {
        let shape = PlanShape::from(&p);
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price_cents: p.price_cents,
            duration_days: match shape.duration {
                DurationShape::Days(d) => Some(d),
                DurationShape::Unlimited => None,
            },
            session_count: match shape.sessions {
                SessionShape::Limited(n) => Some(n),
                SessionShape::Unlimited => None,
            },
            is_unlimited_duration: shape.is_unlimited_duration(),
            is_unlimited_sessions: shape.is_unlimited_sessions(),
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_flags_win_over_counts() {
        let shape = PlanShape::new(Some(8), Some(30), true, true);
        assert!(shape.is_unlimited_sessions());
        assert!(shape.is_unlimited_duration());
        assert_eq!(shape.initial_sessions(), UNLIMITED_SESSIONS_SENTINEL);
    }

    #[test]
    fn test_missing_counts_mean_unlimited() {
        let shape = PlanShape::new(None, None, false, false);
        assert_eq!(shape.sessions, SessionShape::Unlimited);
        assert_eq!(shape.duration, DurationShape::Unlimited);
    }

    #[test]
    fn test_end_date_from_start() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();
        let limited = PlanShape::new(Some(8), Some(30), false, false);
        assert_eq!(
            limited.end_date_from(start).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap())
        );
        let forever = PlanShape::new(Some(8), Some(30), false, true);
        assert_eq!(forever.end_date_from(start).unwrap(), None);
    }

    #[test]
    fn test_end_date_overflow_is_a_validation_error() {
        let limited = PlanShape::new(Some(8), Some(30), false, false);
        let err = limited.end_date_from(DateTime::<Utc>::MAX_UTC).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let stored_huge = PlanShape::new(Some(8), Some(i32::MAX), false, false);
        assert!(stored_huge.end_date_from(Utc::now()).is_err());
    }

    #[test]
    fn test_duration_upper_bound() {
        let longest = PlanShape::new(Some(8), Some(MAX_DURATION_DAYS), false, false);
        assert!(validate_plan_fields("Decade", 1000, longest).is_ok());
        let too_long = PlanShape::new(Some(8), Some(100_000_000), false, false);
        assert!(matches!(
            validate_plan_fields("Lifetime-ish", 1000, too_long),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_allowance_hides_sentinel() {
        let unlimited = PlanShape::new(None, Some(30), true, false);
        assert_eq!(unlimited.allowance(0), SessionAllowance::Unlimited);
        let limited = PlanShape::new(Some(10), Some(30), false, false);
        assert_eq!(
            limited.allowance(4),
            SessionAllowance::Limited { remaining: 4 }
        );
    }

    #[test]
    fn test_validate_plan_fields() {
        let ok = PlanShape::new(Some(8), Some(30), false, false);
        assert!(validate_plan_fields("Monthly", 1000, ok).is_ok());
        assert!(validate_plan_fields("  ", 1000, ok).is_err());
        assert!(validate_plan_fields("Monthly", -1, ok).is_err());

        let zero_sessions = PlanShape::new(Some(0), Some(30), false, false);
        assert!(validate_plan_fields("Monthly", 1000, zero_sessions).is_err());

        // a zero count is irrelevant once the plan is flagged unlimited
        let unlimited = PlanShape::new(Some(0), Some(0), true, true);
        assert!(validate_plan_fields("Season pass", 1000, unlimited).is_ok());
    }

    #[test]
    fn test_allowance_serialization() {
        let json = serde_json::to_value(SessionAllowance::Limited { remaining: 2 }).unwrap();
        assert_eq!(json["kind"], "limited");
        assert_eq!(json["remaining"], 2);
        let json = serde_json::to_value(SessionAllowance::Unlimited).unwrap();
        assert_eq!(json["kind"], "unlimited");
    }
}
