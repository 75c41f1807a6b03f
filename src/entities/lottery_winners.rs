use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 中奖记录实体
/// 说明:
/// - drawing_id 唯一，每期最多一条；与抽奖期状态翻转同一事务写入
/// - prize_description / prize_value 冗余快照，后续改配置不影响历史
/// - voucher_code 发给中奖者线下核销
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_winners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub drawing_id: i64,
    pub user_id: Uuid,
    pub prize_description: String,
    pub prize_value: i64,
    pub voucher_code: String,
    pub voucher_expires_at: DateTime<Utc>,
    /// 通知是否已送达（送达失败可重试，不影响开奖本身）
    pub notified: bool,
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
