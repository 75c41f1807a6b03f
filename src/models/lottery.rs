use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    DrawingStatus, EntryCategory, PrizeTier, PrizeType, drawing_entity as drawings,
    entry_entity as entries, winner_entity as winners,
};

use super::PaginatedResponse;

/// 抽奖期信息（对外展示，random_seed 仅留在库里做审计）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawingResponse {
    pub id: i64,
    pub week_start_date: DateTime<Utc>,
    pub draw_date: DateTime<Utc>,
    pub status: DrawingStatus,
    pub prize_tier: PrizeTier,
    pub prize_description: String,
    pub prize_value: i64,
    pub prize_type: PrizeType,
    pub auto_entry_enabled: bool,
    pub auto_entry_quantity: i32,
    pub total_entries: i64,
    pub total_participants: i64,
    pub winning_ticket_number: Option<i64>,
    pub winner_user_id: Option<Uuid>,
    pub drawn_at: Option<DateTime<Utc>>,
}

impl From<drawings::Model> for DrawingResponse {
    fn from(m: drawings::Model) -> Self {
        DrawingResponse {
            id: m.id,
            week_start_date: m.week_start_date,
            draw_date: m.draw_date,
            status: m.status,
            prize_tier: m.prize_tier,
            prize_description: m.prize_description,
            prize_value: m.prize_value,
            prize_type: m.prize_type,
            auto_entry_enabled: m.auto_entry_enabled,
            auto_entry_quantity: m.auto_entry_quantity,
            total_entries: m.total_entries,
            total_participants: m.total_participants,
            winning_ticket_number: m.winning_ticket_number,
            winner_user_id: m.winner_user_id,
            drawn_at: m.drawn_at,
        }
    }
}

/// 用户在本期各类别的券数
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EntryBreakdown {
    pub base: i64,
    pub purchased: i64,
    pub visit: i64,
    pub checkin: i64,
}

impl EntryBreakdown {
    pub fn total(&self) -> i64 {
        self.base + self.purchased + self.visit + self.checkin
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserEntriesInfo {
    pub total: i64,
    pub breakdown: EntryBreakdown,
}

/// 各类别还能再领多少
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RemainingAllowance {
    pub can_purchase: i64,
    pub can_visit: i64,
    pub can_checkin: bool,
}

/// 中奖概率展示: numerator / denominator，percentage 保留 4 位小数
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OddsInfo {
    pub numerator: i64,
    pub denominator: i64,
    pub percentage: String,
}

/// GET /lottery/current 响应。未登录时用户相关字段为全零。
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentLotteryResponse {
    pub drawing: DrawingResponse,
    pub user_entries: UserEntriesInfo,
    pub remaining: RemainingAllowance,
    pub odds: OddsInfo,
    pub time_until_draw: String,
}

/// 基础券发放结果。granted=false 时 reason 给出原因（已有券 / 本期未开启自动发券）。
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnsureBaseEntryResponse {
    pub granted: bool,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PurchaseEntriesRequest {
    /// 要购买的券数 (1..=10)
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseEntriesResponse {
    /// 实际发放数（受剩余限额截断）
    pub granted_quantity: i64,
    pub nice_spent: i64,
    pub new_balance: i64,
    /// 用户本期总券数（发放后）
    pub total_entries: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct VisitBonusRequest {
    /// 到店消费记录ID（幂等键）
    pub visit_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckinBonusRequest {
    /// 打卡门店ID
    pub location_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BonusGrantResponse {
    pub granted: bool,
    pub quantity: i64,
}

/// 单条券流水
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryResponse {
    pub id: i64,
    pub category: EntryCategory,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<entries::Model> for EntryResponse {
    fn from(m: entries::Model) -> Self {
        EntryResponse {
            id: m.id,
            category: m.category,
            quantity: m.quantity,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyEntriesResponse {
    pub drawing_id: i64,
    pub total: i64,
    pub entries: Vec<EntryResponse>,
}

/// 往期中奖公示查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct WinnersQuery {
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

/// 中奖公示条目。兑换码只随中奖通知私发，不进公示列表。
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerResponse {
    pub id: i64,
    pub drawing_id: i64,
    pub user_id: Uuid,
    pub prize_description: String,
    pub prize_value: i64,
    pub created_at: DateTime<Utc>,
}

/// 中奖公示分页响应
pub type WinnerPageResponse = PaginatedResponse<WinnerResponse>;

impl From<winners::Model> for WinnerResponse {
    fn from(m: winners::Model) -> Self {
        WinnerResponse {
            id: m.id,
            drawing_id: m.drawing_id,
            user_id: m.user_id,
            prize_description: m.prize_description,
            prize_value: m.prize_value,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// 开奖请求。不带 drawing_id 时执行最早一期已到期的抽奖。
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ExecuteDrawingRequest {
    pub drawing_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteDrawingResponse {
    pub drawing_id: i64,
    pub winner_user_id: Uuid,
    pub total_tickets: i64,
    pub winning_ticket: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CancelDrawingRequest {
    pub drawing_id: i64,
}

/// 建期结果。本周已有期时 created=false 并返回已有的那期。
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateDrawingResponse {
    pub drawing: DrawingResponse,
    pub created: bool,
}
