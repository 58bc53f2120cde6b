//! Notifier that writes notifications to the tracing log.
//!
//! Always configured, so alerts stay visible when no webhook is set.

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            severity = %notification.severity,
            subject = %notification.subject,
            facility_id = notification.metadata.get("facility_id").map(String::as_str).unwrap_or(""),
            "{}",
            notification.body
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
