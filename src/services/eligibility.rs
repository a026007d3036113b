//! Check-in eligibility rules.
//!
//! Pure functions over already-loaded rows; the check-in transaction calls the
//! same predicate again on freshly read data before it writes anything.

use crate::models::{IneligibleReason, SubscriptionWithPlan};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility<'a> {
    Eligible(&'a SubscriptionWithPlan),
    Ineligible(IneligibleReason),
}

impl<'a> Eligibility<'a> {
    pub fn subscription(&self) -> Option<&'a SubscriptionWithPlan> {
        match self {
            Eligibility::Eligible(s) => Some(s),
            Eligibility::Ineligible(_) => None,
        }
    }
}

fn has_sessions(s: &SubscriptionWithPlan) -> bool {
    s.shape().is_unlimited_sessions() || s.subscription.remaining_sessions > 0
}

fn is_unexpired(s: &SubscriptionWithPlan, now: DateTime<Utc>) -> bool {
    if s.shape().is_unlimited_duration() {
        return true;
    }
    match s.subscription.end_date {
        None => true,
        Some(end) => end > now,
    }
}

/// Checks a single subscription. The error names the first failing clause.
pub fn check_subscription(
    s: &SubscriptionWithPlan,
    now: DateTime<Utc>,
) -> Result<(), IneligibleReason> {
    if !s.subscription.is_active {
        return Err(IneligibleReason::Inactive);
    }
    if !is_unexpired(s, now) {
        return Err(IneligibleReason::Expired);
    }
    if !has_sessions(s) {
        return Err(IneligibleReason::Exhausted);
    }
    Ok(())
}

/// Picks the subscription a member checks in against at `now`.
///
/// Several eligible rows should not exist, but nothing in the schema forbids
/// it; the newest one (by `created_at`, then `id`) wins.
pub fn find_eligible_subscription(
    subscriptions: &[SubscriptionWithPlan],
    now: DateTime<Utc>,
) -> Eligibility<'_> {
    let winner = subscriptions
        .iter()
        .filter(|s| check_subscription(s, now).is_ok())
        .max_by_key(|s| (s.subscription.created_at, s.subscription.id));

    if let Some(s) = winner {
        return Eligibility::Eligible(s);
    }
    Eligibility::Ineligible(ineligible_reason(subscriptions, now))
}

fn ineligible_reason(subscriptions: &[SubscriptionWithPlan], now: DateTime<Utc>) -> IneligibleReason {
    if subscriptions.is_empty() {
        return IneligibleReason::NeverSubscribed;
    }
    let mut active = subscriptions.iter().filter(|s| s.subscription.is_active).peekable();
    if active.peek().is_none() {
        return IneligibleReason::Inactive;
    }
    if active.all(|s| !is_unexpired(s, now)) {
        IneligibleReason::Expired
    } else {
        IneligibleReason::Exhausted
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::entities::{plan_entity as plans, subscription_entity as subs};
    use crate::models::SubscriptionWithPlan;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    pub fn plan(unlimited_sessions: bool, unlimited_duration: bool) -> plans::Model {
        plans::Model {
            id: 1,
            name: "8 Sessions".to_string(),
            description: None,
            price_cents: 25_000,
            duration_days: Some(30),
            session_count: Some(8),
            is_unlimited_duration: unlimited_duration,
            is_unlimited_sessions: unlimited_sessions,
            is_active: true,
            created_at: now() - Duration::days(365),
            updated_at: now() - Duration::days(365),
        }
    }

    pub fn sub(
        id: i64,
        remaining: i32,
        is_active: bool,
        end_date: Option<DateTime<Utc>>,
        plan: plans::Model,
    ) -> SubscriptionWithPlan {
        let created = now() - Duration::days(10) + Duration::minutes(id);
        SubscriptionWithPlan::new(
            subs::Model {
                id,
                member_id: 7,
                plan_id: plan.id,
                start_date: created,
                end_date,
                remaining_sessions: remaining,
                is_active,
                created_at: created,
                updated_at: created,
            },
            plan,
        )
    }

    pub fn tomorrow() -> Option<DateTime<Utc>> {
        Some(now() + Duration::days(1))
    }

    pub fn yesterday() -> Option<DateTime<Utc>> {
        Some(now() - Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_active_limited_subscription_with_sessions_is_eligible() {
        let subs = vec![sub(1, 1, true, tomorrow(), plan(false, false))];
        let found = find_eligible_subscription(&subs, now());
        assert_eq!(found.subscription().map(|s| s.subscription.id), Some(1));
    }

    #[test]
    fn test_inactive_subscriptions_are_never_returned() {
        for (unl_sessions, unl_duration) in [(false, false), (true, false), (false, true), (true, true)] {
            let subs = vec![sub(1, 5, false, tomorrow(), plan(unl_sessions, unl_duration))];
            assert_eq!(
                find_eligible_subscription(&subs, now()),
                Eligibility::Ineligible(IneligibleReason::Inactive)
            );
        }
    }

    #[test]
    fn test_unlimited_sessions_ignore_remaining_count() {
        for remaining in [-3, 0, 1, 9999] {
            let subs = vec![sub(1, remaining, true, tomorrow(), plan(true, false))];
            assert!(
                find_eligible_subscription(&subs, now()).subscription().is_some(),
                "remaining={remaining}"
            );
        }
    }

    #[test]
    fn test_past_end_date_is_ineligible_for_limited_duration() {
        let subs = vec![sub(1, 5, true, yesterday(), plan(false, false))];
        assert_eq!(
            find_eligible_subscription(&subs, now()),
            Eligibility::Ineligible(IneligibleReason::Expired)
        );
    }

    #[test]
    fn test_end_date_equal_to_now_is_expired() {
        let subs = vec![sub(1, 5, true, Some(now()), plan(false, false))];
        assert_eq!(
            check_subscription(&subs[0], now()),
            Err(IneligibleReason::Expired)
        );
    }

    #[test]
    fn test_unlimited_duration_ignores_past_end_date() {
        let subs = vec![sub(1, 5, true, yesterday(), plan(false, true))];
        assert!(find_eligible_subscription(&subs, now()).subscription().is_some());
    }

    #[test]
    fn test_missing_end_date_never_expires() {
        let subs = vec![sub(1, 5, true, None, plan(false, false))];
        assert!(find_eligible_subscription(&subs, now()).subscription().is_some());
    }

    #[test]
    fn test_exhausted_subscription_reason() {
        let subs = vec![sub(1, 0, true, tomorrow(), plan(false, false))];
        assert_eq!(
            find_eligible_subscription(&subs, now()),
            Eligibility::Ineligible(IneligibleReason::Exhausted)
        );
    }

    #[test]
    fn test_no_subscriptions_reason() {
        assert_eq!(
            find_eligible_subscription(&[], now()),
            Eligibility::Ineligible(IneligibleReason::NeverSubscribed)
        );
    }

    #[test]
    fn test_expired_and_exhausted_reports_expired() {
        let subs = vec![sub(1, 0, true, yesterday(), plan(false, false))];
        assert_eq!(
            find_eligible_subscription(&subs, now()),
            Eligibility::Ineligible(IneligibleReason::Expired)
        );
    }

    #[test]
    fn test_exhausted_wins_over_expired_when_both_present() {
        let subs = vec![
            sub(1, 4, true, yesterday(), plan(false, false)),
            sub(2, 0, true, tomorrow(), plan(false, false)),
        ];
        assert_eq!(
            find_eligible_subscription(&subs, now()),
            Eligibility::Ineligible(IneligibleReason::Exhausted)
        );
    }

    #[test]
    fn test_newest_eligible_subscription_wins() {
        let subs = vec![
            sub(3, 2, true, tomorrow(), plan(false, false)),
            sub(9, 2, true, tomorrow(), plan(false, false)),
            sub(5, 2, true, tomorrow(), plan(false, false)),
        ];
        let found = find_eligible_subscription(&subs, now());
        assert_eq!(found.subscription().map(|s| s.subscription.id), Some(9));
    }

    #[test]
    fn test_tie_on_created_at_falls_back_to_id() {
        let mut a = sub(4, 2, true, tomorrow(), plan(false, false));
        let mut b = sub(6, 2, true, tomorrow(), plan(false, false));
        let same = now() - Duration::days(1);
        a.subscription.created_at = same;
        b.subscription.created_at = same;
        let subs = vec![b, a];
        let found = find_eligible_subscription(&subs, now());
        assert_eq!(found.subscription().map(|s| s.subscription.id), Some(6));
    }

    #[test]
    fn test_newer_ineligible_row_does_not_hide_older_eligible_one() {
        let subs = vec![
            sub(1, 3, true, tomorrow(), plan(false, false)),
            sub(2, 0, true, tomorrow(), plan(false, false)),
        ];
        let found = find_eligible_subscription(&subs, now());
        assert_eq!(found.subscription().map(|s| s.subscription.id), Some(1));
    }
}
