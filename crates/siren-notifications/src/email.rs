//! Email delivery for dispatch alerts.

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::types::DispatchAlert;

/// Delivery channel for dispatch alerts.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Deliver a dispatch alert to the assigned hospital.
    async fn send_dispatch_alert(&self, alert: &DispatchAlert) -> Result<(), NotificationError>;

    /// Returns the name of this channel for logging/debugging.
    fn name(&self) -> &'static str;
}

/// SMTP configuration for the email channel.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
}

/// Sends dispatch alerts over SMTP.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_subject(alert: &DispatchAlert) -> String {
        format!("Emergency Alert: {}", alert.emergency_type)
    }

    /// Plain-text body with a maps link to the reporter's position.
    fn build_body(alert: &DispatchAlert) -> String {
        format!(
            r#"Emergency reported by: {}
Type: {}
Ambulance Assigned: {}
Hospital: {}
Location: https://www.google.com/maps?q={},{}

ETA: {} minutes
Please respond immediately.
"#,
            alert.reporter_name,
            alert.emergency_type,
            alert.ambulance_id,
            alert.hospital_name,
            alert.location.latitude,
            alert.location.longitude,
            alert.eta_minutes,
        )
    }
}

#[async_trait]
impl AlertNotifier for SmtpNotifier {
    async fn send_dispatch_alert(&self, alert: &DispatchAlert) -> Result<(), NotificationError> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        let subject = Self::build_subject(alert);
        let body = Self::build_body(alert);

        let from = format!(
            "\"Emergency Alert - {}\" <{}>",
            alert.reporter_email, self.config.from_email
        );

        let email = Message::builder()
            .from(from.parse().map_err(|e| {
                NotificationError::invalid_config(format!("Invalid from email: {e}"))
            })?)
            .reply_to(alert.reporter_email.parse().map_err(|e| {
                NotificationError::invalid_config(format!("Invalid reply-to email: {e}"))
            })?)
            .to(alert.hospital_email.parse().map_err(|e| {
                NotificationError::invalid_config(format!("Invalid recipient email: {e}"))
            })?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotificationError::send_failed(e.to_string()))?;

        let mut mailer_builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|e| NotificationError::invalid_config(e.to_string()))?
            .port(self.config.port);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            mailer_builder =
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let mailer = mailer_builder.build();

        match mailer.send(email).await {
            Ok(_) => {
                tracing::info!(
                    incident_id = %alert.incident_id,
                    recipient = %alert.hospital_email,
                    "Dispatch alert sent"
                );
                Ok(())
            }
            Err(e) => Err(NotificationError::send_failed(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Discards alerts. Used when no email provider is configured and in tests.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl AlertNotifier for NoopNotifier {
    async fn send_dispatch_alert(&self, alert: &DispatchAlert) -> Result<(), NotificationError> {
        tracing::debug!(
            incident_id = %alert.incident_id,
            "No email provider configured, dropping dispatch alert"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::GeoPoint;

    fn alert() -> DispatchAlert {
        DispatchAlert {
            incident_id: "INC-1".into(),
            emergency_type: "Cardiac".into(),
            reporter_name: "Ravi".into(),
            reporter_email: "ravi@example.com".into(),
            hospital_name: "City General".into(),
            hospital_email: "dispatch@citygeneral.example".into(),
            ambulance_id: "AMB-001".into(),
            location: GeoPoint::new(12.9716, 77.5946),
            eta_minutes: 9,
        }
    }

    #[test]
    fn test_build_subject() {
        assert_eq!(
            SmtpNotifier::build_subject(&alert()),
            "Emergency Alert: Cardiac"
        );
    }

    #[test]
    fn test_build_body_contains_maps_link_and_eta() {
        let body = SmtpNotifier::build_body(&alert());
        assert!(body.contains("https://www.google.com/maps?q=12.9716,77.5946"));
        assert!(body.contains("ETA: 9 minutes"));
        assert!(body.contains("Ambulance Assigned: AMB-001"));
        assert!(body.contains("Hospital: City General"));
    }

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        let notifier = NoopNotifier;
        assert!(notifier.send_dispatch_alert(&alert()).await.is_ok());
        assert_eq!(notifier.name(), "noop");
    }
}
