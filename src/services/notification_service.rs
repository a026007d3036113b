use crate::config::NotificationConfig;
use crate::entities::{
    member_entity as members, outbox_entity as outbox, plan_entity as plans,
    subscription_entity as subs,
};
use crate::error::AppResult;
use crate::models::Notification;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Delivers a rendered notification to its recipient.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;
}

/// Queues `notification` in the outbox on `conn`, usually an open transaction.
pub async fn enqueue_notification<C: ConnectionTrait>(
    conn: &C,
    member_id: i64,
    notification: &Notification,
    now: DateTime<Utc>,
) -> AppResult<outbox::Model> {
    let row = outbox::ActiveModel {
        event_id: Set(Uuid::new_v4().to_string()),
        kind: Set(notification.kind().to_string()),
        member_id: Set(member_id),
        payload: Set(serde_json::to_string(notification)?),
        status: Set(outbox::STATUS_PENDING.to_string()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        sent_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(row)
}

#[derive(Clone)]
pub struct NotificationService {
    pool: DatabaseConnection,
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
}

impl NotificationService {
    pub fn new(
        pool: DatabaseConnection,
        sender: Arc<dyn NotificationSender>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            pool,
            sender,
            config,
        }
    }

    /// Sends one batch of pending outbox rows. Returns how many were delivered.
    pub async fn dispatch_pending(&self) -> AppResult<u64> {
        let batch = outbox::Entity::find()
            .filter(outbox::Column::Status.eq(outbox::STATUS_PENDING))
            .order_by_asc(outbox::Column::Id)
            .limit(self.config.batch_size)
            .all(&self.pool)
            .await?;

        let mut delivered = 0;
        for row in batch {
            let result = match serde_json::from_str::<Notification>(&row.payload) {
                Ok(notification) => self.sender.send(&notification).await,
                Err(e) => Err(e.into()),
            };

            let event_id = row.event_id.clone();
            let attempts = row.attempts + 1;
            let mut am = row.into_active_model();
            am.attempts = Set(attempts);
            match result {
                Ok(()) => {
                    am.status = Set(outbox::STATUS_SENT.to_string());
                    am.sent_at = Set(Some(Utc::now()));
                    am.last_error = Set(None);
                    delivered += 1;
                }
                Err(e) => {
                    log::warn!("Notification {event_id} failed (attempt {attempts}): {e}");
                    if attempts >= self.config.max_attempts {
                        log::error!("Notification {event_id} gave up after {attempts} attempts");
                        am.status = Set(outbox::STATUS_FAILED.to_string());
                    }
                    am.last_error = Set(Some(e.to_string()));
                }
            }
            am.update(&self.pool).await?;
        }
        Ok(delivered)
    }

    /// Queues low-session and upcoming-expiry reminders for active subscriptions.
    ///
    /// A member is not reminded twice of the same kind within one reminder interval.
    pub async fn enqueue_reminders(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let rows = subs::Entity::find()
            .filter(subs::Column::IsActive.eq(true))
            .find_also_related(plans::Entity)
            .order_by_asc(subs::Column::Id)
            .all(&self.pool)
            .await?;

        let expiry_horizon = now + Duration::days(self.config.expiry_window_days);
        let mut queued = 0;
        for (sub, plan) in rows {
            let Some(plan) = plan else { continue };

            let low_sessions = !plan.is_unlimited_sessions
                && (1..=self.config.low_session_threshold).contains(&sub.remaining_sessions);
            let expiring = match sub.end_date {
                Some(end) if !plan.is_unlimited_duration => end > now && end <= expiry_horizon,
                _ => false,
            };
            if !low_sessions && !expiring {
                continue;
            }

            let Some(member) = members::Entity::find_by_id(sub.member_id)
                .one(&self.pool)
                .await?
            else {
                continue;
            };

            let mut pending = Vec::new();
            if low_sessions {
                pending.push(Notification::SessionReminder {
                    member_name: member.full_name(),
                    email: member.email.clone(),
                    plan_name: plan.name.clone(),
                    remaining_sessions: sub.remaining_sessions,
                });
            }
            if let (true, Some(end_date)) = (expiring, sub.end_date) {
                pending.push(Notification::MembershipExpiry {
                    member_name: member.full_name(),
                    email: member.email.clone(),
                    plan_name: plan.name.clone(),
                    end_date,
                });
            }

            for notification in pending {
                if self.recently_queued(member.id, notification.kind(), now).await? {
                    continue;
                }
                enqueue_notification(&self.pool, member.id, &notification, now).await?;
                queued += 1;
            }
        }

        if queued > 0 {
            log::info!("Queued {queued} reminder notification(s)");
        }
        Ok(queued)
    }

    async fn recently_queued(
        &self,
        member_id: i64,
        kind: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let since = now - Duration::seconds(self.config.reminder_interval_secs as i64);
        let count = outbox::Entity::find()
            .filter(outbox::Column::MemberId.eq(member_id))
            .filter(outbox::Column::Kind.eq(kind))
            .filter(outbox::Column::CreatedAt.gt(since))
            .count(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DbPool, test_pool};
    use crate::error::AppError;
    use crate::models::SessionAllowance;
    use crate::services::test_support::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, notification: &Notification) -> AppResult<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl NotificationSender for FailingSender {
        async fn send(&self, _notification: &Notification) -> AppResult<()> {
            Err(AppError::ExternalApiError("mail relay unavailable".to_string()))
        }
    }

    fn config() -> NotificationConfig {
        NotificationConfig {
            max_attempts: 2,
            ..Default::default()
        }
    }

    fn sample(email: &str) -> Notification {
        Notification::check_in(
            "Ama Mensah".to_string(),
            email.to_string(),
            "8 Sessions".to_string(),
            SessionAllowance::Limited { remaining: 4 },
        )
    }

    async fn outbox_rows(db: &DbPool) -> Vec<outbox::Model> {
        outbox::Entity::find()
            .order_by_asc(outbox::Column::Id)
            .all(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_marks_rows_sent_in_order() {
        let db = test_pool().await;
        let member = seed_member(&db, "Ama", "ama@example.com").await;
        enqueue_notification(&db, member.id, &sample("first@example.com"), Utc::now())
            .await
            .unwrap();
        enqueue_notification(&db, member.id, &sample("second@example.com"), Utc::now())
            .await
            .unwrap();

        let sender = Arc::new(RecordingSender::default());
        let svc = NotificationService::new(db.clone(), sender.clone(), config());
        assert_eq!(svc.dispatch_pending().await.unwrap(), 2);

        let sent = sender.sent.lock().unwrap().clone();
        assert_eq!(sent[0].recipient(), "first@example.com");
        assert_eq!(sent[1].recipient(), "second@example.com");
        for row in outbox_rows(&db).await {
            assert_eq!(row.status, outbox::STATUS_SENT);
            assert_eq!(row.attempts, 1);
            assert!(row.sent_at.is_some());
        }

        assert_eq!(svc.dispatch_pending().await.unwrap(), 0);
        assert_eq!(sender.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_retry_until_max_attempts() {
        let db = test_pool().await;
        let member = seed_member(&db, "Ama", "ama@example.com").await;
        enqueue_notification(&db, member.id, &sample("ama@example.com"), Utc::now())
            .await
            .unwrap();
        let svc = NotificationService::new(db.clone(), Arc::new(FailingSender), config());

        assert_eq!(svc.dispatch_pending().await.unwrap(), 0);
        let row = &outbox_rows(&db).await[0];
        assert_eq!(row.status, outbox::STATUS_PENDING);
        assert_eq!(row.attempts, 1);
        assert!(row.last_error.as_deref().unwrap().contains("mail relay unavailable"));

        svc.dispatch_pending().await.unwrap();
        let row = &outbox_rows(&db).await[0];
        assert_eq!(row.status, outbox::STATUS_FAILED);
        assert_eq!(row.attempts, 2);

        svc.dispatch_pending().await.unwrap();
        assert_eq!(outbox_rows(&db).await[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_reminders_for_low_sessions_and_expiry() {
        let db = test_pool().await;
        let now = Utc::now();
        let plan = seed_plan(&db, Some(10), false, false).await;
        let low = seed_member(&db, "Ama", "ama@example.com").await;
        let expiring = seed_member(&db, "Kojo", "kojo@example.com").await;
        let fine = seed_member(&db, "Esi", "esi@example.com").await;
        seed_subscription(&db, low.id, &plan, 2, Some(now + Duration::days(20)), true).await;
        seed_subscription(&db, expiring.id, &plan, 8, Some(now + Duration::days(3)), true).await;
        seed_subscription(&db, fine.id, &plan, 8, Some(now + Duration::days(20)), true).await;

        let svc = NotificationService::new(
            db.clone(),
            Arc::new(RecordingSender::default()),
            NotificationConfig::default(),
        );
        assert_eq!(svc.enqueue_reminders(now).await.unwrap(), 2);

        let rows = outbox_rows(&db).await;
        let kinds: Vec<(i64, &str)> = rows.iter().map(|r| (r.member_id, r.kind.as_str())).collect();
        assert!(kinds.contains(&(low.id, "session_reminder")));
        assert!(kinds.contains(&(expiring.id, "membership_expiry")));

        assert_eq!(svc.enqueue_reminders(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_reminders_for_unlimited_or_inactive() {
        let db = test_pool().await;
        let now = Utc::now();
        let unlimited = seed_plan(&db, None, true, true).await;
        let limited = seed_plan(&db, Some(10), false, false).await;
        let a = seed_member(&db, "Ama", "ama@example.com").await;
        let b = seed_member(&db, "Kojo", "kojo@example.com").await;
        seed_subscription(&db, a.id, &unlimited, 2, Some(now + Duration::days(1)), true).await;
        seed_subscription(&db, b.id, &limited, 1, Some(now + Duration::days(1)), false).await;

        let svc = NotificationService::new(
            db.clone(),
            Arc::new(RecordingSender::default()),
            NotificationConfig::default(),
        );
        assert_eq!(svc.enqueue_reminders(now).await.unwrap(), 0);
    }
}
