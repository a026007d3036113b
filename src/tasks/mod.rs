//! Background jobs: outbox delivery and reminder scheduling.
//!
//! Call `spawn_all` once during startup.

use crate::config::NotificationConfig;
use crate::services::NotificationService;
use chrono::Utc;
use std::time::Duration;

/// Detaches the recurring jobs via `tokio::spawn`; does not block.
pub fn spawn_all(notification_service: NotificationService, config: &NotificationConfig) {
    // outbox dispatch
    {
        let svc = notification_service.clone();
        let interval = Duration::from_secs(config.poll_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.dispatch_pending().await {
                    Ok(n) if n > 0 => log::info!("Notifications delivered: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to dispatch notifications: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // low-session and expiry reminders
    {
        let svc = notification_service;
        let interval = Duration::from_secs(config.reminder_interval_secs.max(60));
        tokio::spawn(async move {
            loop {
                if let Err(e) = svc.enqueue_reminders(Utc::now()).await {
                    log::error!("Failed to queue reminders: {e:?}");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
