use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 抽奖期状态机: upcoming -> active -> drawn，cancelled 可由前两者进入。
/// 只有开奖执行器能把状态置为 drawn，且不可回退。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum DrawingStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "drawn")]
    Drawn,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// 奖品档位，按周期位置决定（月初/季初升档）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum PrizeTier {
    #[sea_orm(string_value = "standard")]
    Standard,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
}

/// points: 中奖后直接充 Nice 积分; custom: 发放兑换码由线下核销
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum PrizeType {
    #[sea_orm(string_value = "points")]
    Points,
    #[sea_orm(string_value = "custom")]
    Custom,
}

/// 抽奖期实体
/// 说明:
/// - week_start_date 唯一，每周最多一期
/// - total_entries / total_participants 由流水聚合重算，不做增量维护
/// - 开奖后 winning_ticket_number / winner_user_id / random_seed / drawn_at 一并落盘，可审计
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_drawings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 本期周起始（周一 00:00 UTC）
    pub week_start_date: DateTime<Utc>,
    /// 计划开奖时间（周日 20:00 UTC）
    pub draw_date: DateTime<Utc>,
    pub status: DrawingStatus,
    pub prize_tier: PrizeTier,
    pub prize_description: String,
    pub prize_value: i64,
    pub prize_type: PrizeType,
    /// 是否给首次参与的用户发放免费基础券
    pub auto_entry_enabled: bool,
    pub auto_entry_quantity: i32,
    /// 聚合缓存，读展示用；开奖时以流水重算为准
    pub total_entries: i64,
    pub total_participants: i64,
    pub winning_ticket_number: Option<i64>,
    pub winner_user_id: Option<Uuid>,
    /// 开奖使用的随机数原值（审计）
    pub random_seed: Option<String>,
    pub drawn_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
