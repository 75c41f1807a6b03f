use crate::config::VisitsConfig;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verified: bool,
}

/// 到店/消费记录服务客户端。奖励券发放前的防刷校验都走这里：
/// 记录必须属于该用户，且时间不早于本期 week_start_date。
#[derive(Clone)]
pub struct VisitsApi {
    client: Client,
    config: VisitsConfig,
}

impl VisitsApi {
    pub fn new(config: VisitsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// 校验到店消费记录归属与时间窗口（visit 奖励）
    pub async fn verify_visit(
        &self,
        user_id: Uuid,
        visit_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let url = format!("{}/api/v1/visits/{visit_id}/verify", self.config.base_url);
        self.verify(&url, user_id, since).await
    }

    /// 校验该门店在窗口内是否有本人消费（checkin 奖励）
    pub async fn verify_location_purchase(
        &self,
        user_id: Uuid,
        location_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let url = format!(
            "{}/api/v1/locations/{location_id}/purchases/verify",
            self.config.base_url
        );
        self.verify(&url, user_id, since).await
    }

    async fn verify(&self, url: &str, user_id: Uuid, since: DateTime<Utc>) -> AppResult<bool> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("user_id", user_id.to_string()),
                ("since", since.to_rfc3339()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Visits service returned {status}: {text}"
            )));
        }

        Ok(response.json::<VerifyResponse>().await?.verified)
    }
}
