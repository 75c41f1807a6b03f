use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 抽奖券来源类别
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// 免费基础券（本期首次参与时发放）
    #[sea_orm(string_value = "base")]
    Base,
    /// Nice 积分购买
    #[sea_orm(string_value = "purchased")]
    Purchased,
    /// 到店消费奖励
    #[sea_orm(string_value = "visit")]
    Visit,
    /// 门店打卡奖励
    #[sea_orm(string_value = "checkin")]
    Checkin,
}

/// 抽奖券流水实体
/// 说明:
/// - 只增不改不删；(user, drawing, category) 的当前数量永远是对流水求和
/// - visit_id 仅 visit 类别使用，数据库唯一索引保证同一到店记录只换一次
/// - nice_spent 仅 purchased 类别使用，记录本行消耗的积分
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub drawing_id: i64,
    pub user_id: Uuid,
    pub category: EntryCategory,
    /// 本行发放的券数，恒为正
    pub quantity: i32,
    pub nice_spent: Option<i64>,
    pub visit_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::lottery_drawings::Entity",
        from = "Column::DrawingId",
        to = "crate::entities::lottery_drawings::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Drawing,
}

impl ActiveModelBehavior for ActiveModel {}
