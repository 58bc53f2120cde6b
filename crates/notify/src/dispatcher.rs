//! Routes notifications to configured channels.
//!
//! Every channel receives each notification at or above the minimum
//! severity. Individual channel failures don't block other channels.

use gridwatch_core::config::NotifyConfig;
use gridwatch_core::Severity;

use crate::log::LogNotifier;
use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};
use crate::webhook::WebhookNotifier;

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
    min_severity: Severity,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>, min_severity: Severity) -> Self {
        Self {
            channels,
            min_severity,
        }
    }

    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Severity::Low)
    }

    /// Log channel always; webhook when `ALERT_WEBHOOK_URL` is set.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let mut channels: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
        if let Some(url) = config.webhook_url.as_deref() {
            channels.push(Box::new(WebhookNotifier::new(url)?));
        }
        Ok(Self::new(channels, config.min_severity))
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    /// Deliver to every channel in order, one result per channel.
    ///
    /// Notifications below the minimum severity are dropped and yield no
    /// results. A failing channel is logged and the remaining channels are
    /// still tried.
    pub async fn dispatch(&self, notification: &Notification) -> Vec<DispatchResult> {
        if notification.severity < self.min_severity {
            tracing::debug!(
                severity = %notification.severity,
                min_severity = %self.min_severity,
                subject = %notification.subject,
                "notification below minimum severity"
            );
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            results.push(deliver(channel.as_ref(), notification).await);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            tracing::warn!(
                failed,
                channels = results.len(),
                subject = %notification.subject,
                "notification not delivered on every channel"
            );
        }
        results
    }
}

async fn deliver(channel: &dyn Notifier, notification: &Notification) -> DispatchResult {
    let started = std::time::Instant::now();
    let outcome = channel.send(notification).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let error = outcome.err().map(|e| {
        tracing::warn!(channel = channel.channel_name(), error = %e, duration_ms, "notification delivery failed");
        e.to_string()
    });
    if error.is_none() {
        tracing::debug!(channel = channel.channel_name(), duration_ms, "notification delivered");
    }

    DispatchResult {
        channel: channel.channel_name().to_string(),
        success: error.is_none(),
        error,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records subjects it was asked to send; optionally fails every send.
    #[derive(Clone)]
    struct Channel {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
        broken: bool,
    }

    impl Channel {
        fn new(name: &'static str, broken: bool) -> Self {
            Self { name, seen: Arc::default(), broken }
        }

        fn boxed(&self) -> Box<dyn Notifier> {
            Box::new(self.clone())
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for Channel {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(notification.subject.clone());
            if self.broken {
                return Err(NotifyError::Status { status: 503, body: "unavailable".into() });
            }
            Ok(())
        }

        fn channel_name(&self) -> &str {
            self.name
        }
    }

    fn notification(severity: Severity) -> Notification {
        Notification {
            subject: format!("[{severity}] Energy Grid Anomaly - facility-001"),
            body: "body".to_string(),
            severity,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn every_channel_receives_notification() {
        let a = Channel::new("a", false);
        let b = Channel::new("b", false);
        let dispatcher = Dispatcher::new(vec![a.boxed(), b.boxed()], Severity::Low);

        let results = dispatcher.dispatch(&notification(Severity::High)).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success && r.error.is_none()));
        assert_eq!(a.seen(), vec!["[high] Energy Grid Anomaly - facility-001"]);
        assert_eq!(b.seen().len(), 1);
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_the_rest() {
        let down = Channel::new("down", true);
        let up = Channel::new("up", false);
        let dispatcher = Dispatcher::new(vec![down.boxed(), up.boxed()], Severity::Low);

        let results = dispatcher.dispatch(&notification(Severity::Low)).await;
        assert_eq!(results[0].channel, "down");
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("503"));
        assert!(results[1].success);
        assert_eq!(up.seen().len(), 1);
    }

    #[tokio::test]
    async fn below_minimum_severity_is_skipped() {
        let a = Channel::new("a", false);
        let dispatcher = Dispatcher::new(vec![a.boxed()], Severity::High);

        assert!(dispatcher.dispatch(&notification(Severity::Medium)).await.is_empty());
        assert_eq!(dispatcher.dispatch(&notification(Severity::Critical)).await.len(), 1);
        assert_eq!(a.seen().len(), 1);
    }

    #[tokio::test]
    async fn no_channels_no_results() {
        let results = Dispatcher::empty().dispatch(&notification(Severity::Critical)).await;
        assert!(results.is_empty());
    }

    #[test]
    fn config_adds_webhook_channel() {
        let config = NotifyConfig {
            webhook_url: Some("https://hooks.example.com/grid".into()),
            min_severity: Severity::Medium,
        };
        let dispatcher = Dispatcher::from_config(&config).unwrap();
        assert_eq!(dispatcher.channel_names(), vec!["log", "webhook"]);

        let bad = NotifyConfig { webhook_url: Some("::nope".into()), ..NotifyConfig::default() };
        assert!(Dispatcher::from_config(&bad).is_err());
    }
}
