//! Chat webhook notifier (Slack-compatible payload)

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::host::types::{Project, Release};
use crate::notify::{NotifyError, Notifier, format_message};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts one message per new release to an incoming webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("release-monitor")
                .timeout(timeout)
                .build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, project: &Project, release: &Release) -> Result<(), NotifyError> {
        let text = format_message(project, release);

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { text: &text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook returned status {} for {}", status, project.key());
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        debug!("Delivered webhook notification for {}", project.key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::types::HostType;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn fixture() -> (Project, Release) {
        let project = Project::new(HostType::Npm, "lodash", "lodash");
        let release = Release {
            version: "4.17.21".to_string(),
            url: "https://www.npmjs.com/package/lodash".to_string(),
            published_at: Utc::now(),
            project: project.key(),
        };
        (project, release)
    }

    #[tokio::test]
    async fn notify_posts_text_payload() {
        let mut server = Server::new_async().await;
        let (project, release) = fixture();

        let mock = server
            .mock("POST", "/hooks/abc")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "text": "New release of lodash (npm/lodash): 4.17.21 - https://www.npmjs.com/package/lodash"
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(&format!("{}/hooks/abc", server.url()), Duration::from_secs(5))
                .unwrap();
        let result = notifier.notify(&project, &release).await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn notify_reports_rejected_status() {
        let mut server = Server::new_async().await;
        let (project, release) = fixture();

        server
            .mock("POST", "/hooks/abc")
            .with_status(404)
            .with_body("no_service")
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(&format!("{}/hooks/abc", server.url()), Duration::from_secs(5))
                .unwrap();
        let result = notifier.notify(&project, &release).await;

        assert!(matches!(result, Err(NotifyError::Rejected(404))));
    }
}
