use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct NotifyRequest<'a> {
    user_id: Uuid,
    title: &'a str,
    body: &'a str,
    url: &'a str,
}

/// 推送/站内信服务客户端。送达失败由调用方决定是否重试，
/// 开奖流程里通知失败不回滚开奖。
#[derive(Clone)]
pub struct NotificationApi {
    client: Client,
    config: NotificationConfig,
}

impl NotificationApi {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn notify_user(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        url: &str,
    ) -> AppResult<()> {
        let endpoint = format!("{}/api/v1/notifications", self.config.base_url);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&NotifyRequest {
                user_id,
                title,
                body,
                url,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Notification service returned {status}: {text}"
            )));
        }

        Ok(())
    }
}
