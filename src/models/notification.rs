use crate::models::SessionAllowance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound member notification, stored as JSON in `notification_outbox.payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    CheckIn {
        member_name: String,
        email: String,
        plan_name: String,
        remaining_sessions: Option<i32>,
        is_unlimited: bool,
    },
    SessionReminder {
        member_name: String,
        email: String,
        plan_name: String,
        remaining_sessions: i32,
    },
    MembershipExpiry {
        member_name: String,
        email: String,
        plan_name: String,
        end_date: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Notification {
    pub fn check_in(
        member_name: String,
        email: String,
        plan_name: String,
        allowance: SessionAllowance,
    ) -> Self {
        Notification::CheckIn {
            member_name,
            email,
            plan_name,
            remaining_sessions: allowance.remaining(),
            is_unlimited: allowance.is_unlimited(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::CheckIn { .. } => "check_in",
            Notification::SessionReminder { .. } => "session_reminder",
            Notification::MembershipExpiry { .. } => "membership_expiry",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::CheckIn { email, .. }
            | Notification::SessionReminder { email, .. }
            | Notification::MembershipExpiry { email, .. } => email,
        }
    }

    pub fn to_email(&self, brand: &str) -> EmailMessage {
        let (greeting_name, subject, body) = match self {
            Notification::CheckIn {
                member_name,
                plan_name,
                remaining_sessions,
                is_unlimited,
                ..
            } => {
                let needs_renewal = !is_unlimited && remaining_sessions.unwrap_or(0) <= 0;
                let subject = if needs_renewal {
                    format!("Important: Your {brand} Membership Needs Renewal")
                } else {
                    format!("Your {brand} Check-In Confirmation")
                };
                let detail = if *is_unlimited {
                    format!(
                        "<p>You have an <strong>unlimited {plan_name}</strong> membership.</p>"
                    )
                } else if needs_renewal {
                    format!(
                        "<p>Your <strong>{plan_name}</strong> membership has <strong>0 sessions</strong> remaining.</p>\
                         <p>Please renew your membership to keep skating.</p>"
                    )
                } else {
                    format!(
                        "<p>Your <strong>{plan_name}</strong> membership has <strong>{} session(s)</strong> remaining.</p>",
                        remaining_sessions.unwrap_or(0)
                    )
                };
                (
                    member_name,
                    subject,
                    format!("<p>Thank you for checking in at {brand}!</p>{detail}"),
                )
            }
            Notification::SessionReminder {
                member_name,
                plan_name,
                remaining_sessions,
                ..
            } => (
                member_name,
                "Your Session Reminder".to_string(),
                format!(
                    "<p>Your <strong>{plan_name}</strong> membership has only <strong>{remaining_sessions} session(s)</strong> left.</p>"
                ),
            ),
            Notification::MembershipExpiry {
                member_name,
                plan_name,
                end_date,
                ..
            } => (
                member_name,
                "Your Membership is Expiring Soon".to_string(),
                format!(
                    "<p>Your <strong>{plan_name}</strong> membership expires on <strong>{}</strong>.</p>",
                    end_date.format("%Y-%m-%d")
                ),
            ),
        };

        EmailMessage {
            to: self.recipient().to_string(),
            subject,
            html: format!(
                "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
                 <h2>Hello {greeting_name},</h2>{body}<p>Best regards,<br>The {brand} Team</p></div>"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_in(remaining: Option<i32>, unlimited: bool) -> Notification {
        Notification::CheckIn {
            member_name: "Ama Mensah".into(),
            email: "ama@example.com".into(),
            plan_name: "8 Sessions".into(),
            remaining_sessions: remaining,
            is_unlimited: unlimited,
        }
    }

    #[test]
    fn test_check_in_subjects() {
        let ok = check_in(Some(3), false).to_email("Skate City");
        assert_eq!(ok.subject, "Your Skate City Check-In Confirmation");
        assert!(ok.html.contains("3 session(s)"));

        let last = check_in(Some(0), false).to_email("Skate City");
        assert_eq!(
            last.subject,
            "Important: Your Skate City Membership Needs Renewal"
        );

        let unlimited = check_in(None, true).to_email("Skate City");
        assert_eq!(unlimited.subject, "Your Skate City Check-In Confirmation");
        assert!(unlimited.html.contains("unlimited 8 Sessions"));
        assert_eq!(unlimited.to, "ama@example.com");
    }

    #[test]
    fn test_payload_carries_kind_tag() {
        let n = Notification::check_in(
            "Ama Mensah".into(),
            "ama@example.com".into(),
            "Season".into(),
            SessionAllowance::Unlimited,
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], n.kind());
        assert_eq!(json["is_unlimited"], true);
        assert!(json["remaining_sessions"].is_null());
        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back, n);
    }
}
