//! HTTP webhook notifier.
//!
//! Delivers each notification as a JSON payload
//! (`subject`, `body`, `severity`, `metadata`) to one endpoint.

use crate::traits::{Notification, Notifier, NotifyError};

/// Posts notifications as JSON to a configured endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: reqwest::Url,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// The URL is validated eagerly; only `http` and `https` are accepted.
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| NotifyError::Config(format!("invalid webhook url {url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NotifyError::Config(format!(
                "unsupported webhook scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            url: parsed,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(notification)?;

        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.url,
            status = %status,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_url() {
        let notifier = WebhookNotifier::new("https://hooks.example.com/grid").unwrap();
        assert_eq!(notifier.url(), "https://hooks.example.com/grid");
        assert_eq!(notifier.channel_name(), "webhook");
    }

    #[test]
    fn rejects_malformed_url() {
        match WebhookNotifier::new("not a url").unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("invalid webhook url")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(WebhookNotifier::new("ftp://example.com/hook").is_err());
    }
}
