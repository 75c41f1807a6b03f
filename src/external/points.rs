use crate::config::PointsConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 积分账本变动请求。amount 正数为充入，负数为扣减。
#[derive(Debug, Serialize)]
struct LedgerChangeRequest<'a> {
    user_id: Uuid,
    amount: i64,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LedgerChangeResponse {
    pub success: bool,
    pub new_balance: i64,
    pub error_code: Option<String>,
}

/// Nice 积分账本服务客户端。账本本身不归本服务管，只消费它的变动接口。
#[derive(Clone)]
pub struct PointsApi {
    client: Client,
    config: PointsConfig,
}

impl PointsApi {
    pub fn new(config: PointsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// 充入积分（积分类奖品的兑付）
    pub async fn award(&self, user_id: Uuid, amount: i64, reason: &str) -> AppResult<i64> {
        let resp = self.change(user_id, amount, reason).await?;
        if !resp.success {
            return Err(AppError::ExternalApiError(format!(
                "Points award rejected: {:?}",
                resp.error_code
            )));
        }
        Ok(resp.new_balance)
    }

    /// 扣减积分（购买抽奖券）。余额不足是业务失败而非网关错误。
    pub async fn spend(&self, user_id: Uuid, amount: i64, reason: &str) -> AppResult<i64> {
        let resp = self.change(user_id, -amount, reason).await?;
        if !resp.success {
            return match resp.error_code.as_deref() {
                Some("INSUFFICIENT_BALANCE") => Err(AppError::ValidationError(
                    "Insufficient Nice balance".to_string(),
                )),
                other => Err(AppError::ExternalApiError(format!(
                    "Points spend rejected: {other:?}"
                ))),
            };
        }
        Ok(resp.new_balance)
    }

    async fn change(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> AppResult<LedgerChangeResponse> {
        let url = format!("{}/api/v1/ledger/changes", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&LedgerChangeRequest {
                user_id,
                amount,
                reason,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Points service returned {status}: {body}"
            )));
        }

        Ok(response.json::<LedgerChangeResponse>().await?)
    }
}
