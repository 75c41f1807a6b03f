use crate::config::LotteryConfig;
use crate::entities::{EntryCategory, drawing_entity as drawings, entry_entity as entries};
use crate::error::{AppError, AppResult};
use crate::external::{PointsApi, VisitsApi};
use crate::models::{
    BonusGrantResponse, CurrentLotteryResponse, EnsureBaseEntryResponse, EntryBreakdown,
    EntryResponse, MyEntriesResponse, OddsInfo, PurchaseEntriesResponse, RemainingAllowance,
    UserEntriesInfo,
};
use crate::services::DrawingService;
use crate::utils::human_time_until;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

/// 券的发放入口：限额判定 + 流水落盘 + 概率读侧。
/// 判定和落盘放在同一事务里（读限额与插入一起提交或一起放弃）；
/// 聚合缓存重算放在提交之后，尽力而为，失败只记日志。
#[derive(Clone)]
pub struct EntryService {
    pool: DatabaseConnection,
    drawing_service: DrawingService,
    points: PointsApi,
    visits: VisitsApi,
    cfg: LotteryConfig,
}

impl EntryService {
    pub fn new(
        pool: DatabaseConnection,
        drawing_service: DrawingService,
        points: PointsApi,
        visits: VisitsApi,
        cfg: LotteryConfig,
    ) -> Self {
        Self {
            pool,
            drawing_service,
            points,
            visits,
            cfg,
        }
    }

    /// 当前期 + 用户视角：券明细、概率、各类剩余额度、开奖倒计时。
    /// 未登录时用户相关字段为全零。池子总数用聚合缓存，略旧可接受。
    pub async fn get_current(&self, user_id: Option<Uuid>) -> AppResult<CurrentLotteryResponse> {
        let drawing = self.drawing_service.require_current().await?;

        let rows = match user_id {
            Some(uid) => self.user_rows(&self.pool, drawing.id, uid).await?,
            None => Vec::new(),
        };

        let breakdown = breakdown_of(&rows);
        let total = breakdown.total();
        let (pool_total, percentage) = odds_percentage(total, drawing.total_entries);
        let remaining = remaining_allowance(&breakdown, &self.cfg);
        let time_until_draw = human_time_until(drawing.draw_date, Utc::now());

        Ok(CurrentLotteryResponse {
            drawing: drawing.into(),
            user_entries: UserEntriesInfo { total, breakdown },
            remaining,
            odds: OddsInfo {
                numerator: total,
                denominator: pool_total,
                percentage,
            },
            time_until_draw,
        })
    }

    /// 免费基础券：本期开启自动发券、且用户在本期还没有任何类别的券时发一次。
    /// 注意是"任何类别"——先买了券的用户不再补发免费券，线上行为如此，勿改。
    pub async fn ensure_base_entry(&self, user_id: Uuid) -> AppResult<EnsureBaseEntryResponse> {
        let drawing = self.drawing_service.require_current().await?;

        let txn = self.pool.begin().await?;

        let existing = entries::Entity::find()
            .filter(entries::Column::DrawingId.eq(drawing.id))
            .filter(entries::Column::UserId.eq(user_id))
            .count(&txn)
            .await?;
        if let Some(reason) = base_entry_refusal(drawing.auto_entry_enabled, existing) {
            return Ok(EnsureBaseEntryResponse {
                granted: false,
                quantity: 0,
                reason: Some(reason.to_string()),
            });
        }

        let quantity = drawing.auto_entry_quantity.max(1);
        entries::ActiveModel {
            drawing_id: Set(drawing.id),
            user_id: Set(user_id),
            category: Set(EntryCategory::Base),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        self.recalculate_stats_logged(drawing.id).await;

        Ok(EnsureBaseEntryResponse {
            granted: true,
            quantity: quantity as i64,
            reason: None,
        })
    }

    /// 购买券：扣 Nice 积分换券，受每期上限截断。
    /// 请求超出剩余额度时发剩余的部分；额度用尽则明确拒绝。
    pub async fn purchase_entries(
        &self,
        user_id: Uuid,
        requested: i64,
    ) -> AppResult<PurchaseEntriesResponse> {
        let drawing = self.drawing_service.require_current().await?;

        let txn = self.pool.begin().await?;

        let already = self
            .category_total(&txn, drawing.id, user_id, EntryCategory::Purchased)
            .await?;
        let granted = purchase_allowance(
            self.cfg.purchase_cap,
            already,
            requested,
            self.cfg.max_purchase_per_request,
        )?;

        // 先扣积分再写流水：提交失败时宁可少发券也不能多发，
        // 积分侧可由对账补偿
        let nice_spent = granted * self.cfg.entry_cost_nice;
        let new_balance = self
            .points
            .spend(user_id, nice_spent, "lottery_entry_purchase")
            .await?;

        entries::ActiveModel {
            drawing_id: Set(drawing.id),
            user_id: Set(user_id),
            category: Set(EntryCategory::Purchased),
            quantity: Set(granted as i32),
            nice_spent: Set(Some(nice_spent)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        self.recalculate_stats_logged(drawing.id).await;

        let rows = self.user_rows(&self.pool, drawing.id, user_id).await?;
        Ok(PurchaseEntriesResponse {
            granted_quantity: granted,
            nice_spent,
            new_balance,
            total_entries: breakdown_of(&rows).total(),
        })
    }

    /// 到店奖励券：同一到店记录只能兑换一次（visit_id 为幂等键，
    /// 数据库唯一索引兜底），每期最多 visit_cap 张。
    pub async fn award_visit_bonus(
        &self,
        user_id: Uuid,
        visit_id: Uuid,
    ) -> AppResult<BonusGrantResponse> {
        let drawing = self.drawing_service.require_current().await?;

        // 防刷：到店记录必须属于该用户且不早于本期周起始
        let verified = self
            .visits
            .verify_visit(user_id, visit_id, drawing.week_start_date)
            .await?;
        if !verified {
            return Err(AppError::UnverifiedReference(
                "Visit record not found for this user in the current period".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let duplicate = entries::Entity::find()
            .filter(entries::Column::VisitId.eq(visit_id))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(AppError::AlreadyAwarded(
                "This visit has already earned an entry".to_string(),
            ));
        }

        let visit_total = self
            .category_total(&txn, drawing.id, user_id, EntryCategory::Visit)
            .await?;
        if visit_total >= self.cfg.visit_cap {
            return Err(AppError::CapExceeded(
                "You've reached this week's visit bonus limit".to_string(),
            ));
        }

        entries::ActiveModel {
            drawing_id: Set(drawing.id),
            user_id: Set(user_id),
            category: Set(EntryCategory::Visit),
            quantity: Set(1),
            visit_id: Set(Some(visit_id)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        self.recalculate_stats_logged(drawing.id).await;

        Ok(BonusGrantResponse {
            granted: true,
            quantity: 1,
        })
    }

    /// 打卡奖励券：本期一次，一次发 checkin_quantity 张，
    /// 前提是该门店在本期内有本人的真实消费。
    pub async fn award_checkin_bonus(
        &self,
        user_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<BonusGrantResponse> {
        let drawing = self.drawing_service.require_current().await?;

        let verified = self
            .visits
            .verify_location_purchase(user_id, location_id, drawing.week_start_date)
            .await?;
        if !verified {
            return Err(AppError::UnverifiedReference(
                "No verified purchase at this location in the current period".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let checkin_total = self
            .category_total(&txn, drawing.id, user_id, EntryCategory::Checkin)
            .await?;
        if checkin_total > 0 {
            return Err(AppError::AlreadyAwarded(
                "Check-in bonus already claimed this week".to_string(),
            ));
        }

        let quantity = self.cfg.checkin_quantity;
        entries::ActiveModel {
            drawing_id: Set(drawing.id),
            user_id: Set(user_id),
            category: Set(EntryCategory::Checkin),
            quantity: Set(quantity as i32),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        self.recalculate_stats_logged(drawing.id).await;

        Ok(BonusGrantResponse {
            granted: true,
            quantity,
        })
    }

    /// 用户本期券明细
    pub async fn my_entries(&self, user_id: Uuid) -> AppResult<MyEntriesResponse> {
        let drawing = self.drawing_service.require_current().await?;
        let rows = self.user_rows(&self.pool, drawing.id, user_id).await?;
        let total = breakdown_of(&rows).total();

        Ok(MyEntriesResponse {
            drawing_id: drawing.id,
            total,
            entries: rows.into_iter().map(EntryResponse::from).collect(),
        })
    }

    /// 聚合缓存重算：从流水重新求和（券总数 + 去重参与人数）写回抽奖期。
    /// 幂等，任何时候重跑结果一致；计数漂移靠它自愈，不做增量维护。
    pub async fn recalculate_stats(&self, drawing_id: i64) -> AppResult<(i64, i64)> {
        let rows = entries::Entity::find()
            .filter(entries::Column::DrawingId.eq(drawing_id))
            .all(&self.pool)
            .await?;

        let (total_entries, total_participants) = aggregate_totals(&rows);

        drawings::Entity::update_many()
            .col_expr(drawings::Column::TotalEntries, Expr::value(total_entries))
            .col_expr(
                drawings::Column::TotalParticipants,
                Expr::value(total_participants),
            )
            .col_expr(drawings::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(drawings::Column::Id.eq(drawing_id))
            .exec(&self.pool)
            .await?;

        Ok((total_entries, total_participants))
    }

    /// 发放路径上的重算：失败不影响已提交的发放，只记日志
    async fn recalculate_stats_logged(&self, drawing_id: i64) {
        if let Err(e) = self.recalculate_stats(drawing_id).await {
            log::error!("Failed to recalculate stats for drawing {drawing_id}: {e:?}");
        }
    }

    async fn user_rows<C: ConnectionTrait>(
        &self,
        conn: &C,
        drawing_id: i64,
        user_id: Uuid,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::DrawingId.eq(drawing_id))
            .filter(entries::Column::UserId.eq(user_id))
            .all(conn)
            .await
    }

    async fn category_total<C: ConnectionTrait>(
        &self,
        conn: &C,
        drawing_id: i64,
        user_id: Uuid,
        category: EntryCategory,
    ) -> Result<i64, DbErr> {
        let rows = entries::Entity::find()
            .filter(entries::Column::DrawingId.eq(drawing_id))
            .filter(entries::Column::UserId.eq(user_id))
            .filter(entries::Column::Category.eq(category))
            .all(conn)
            .await?;
        Ok(rows.iter().map(|r| r.quantity as i64).sum())
    }
}

/// 聚合重算的核心：流水求和得券总数，按用户去重得参与人数。
/// 纯函数，重跑任意次结果一致。
pub(crate) fn aggregate_totals(rows: &[entries::Model]) -> (i64, i64) {
    let total_entries: i64 = rows.iter().map(|r| r.quantity as i64).sum();
    let mut users: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
    users.sort_unstable();
    users.dedup();
    (total_entries, users.len() as i64)
}

/// 基础券资格判定。None 表示可发，Some(reason) 为拒绝原因。
/// 拒绝条件是用户已持有"任何类别"的券——先买了券的用户
/// 不再补发免费基础券，这是线上既定行为，不是漏判。
pub(crate) fn base_entry_refusal(
    auto_entry_enabled: bool,
    existing_entries: u64,
) -> Option<&'static str> {
    if !auto_entry_enabled {
        return Some("auto_entry_not_enabled");
    }
    if existing_entries > 0 {
        return Some("entries_exist");
    }
    None
}

/// 按类别聚合流水
pub(crate) fn breakdown_of(rows: &[entries::Model]) -> EntryBreakdown {
    let mut breakdown = EntryBreakdown::default();
    for row in rows {
        let q = row.quantity as i64;
        match row.category {
            EntryCategory::Base => breakdown.base += q,
            EntryCategory::Purchased => breakdown.purchased += q,
            EntryCategory::Visit => breakdown.visit += q,
            EntryCategory::Checkin => breakdown.checkin += q,
        }
    }
    breakdown
}

/// 购买限额判定：返回本次实际可发放的数量。
/// 请求量不在 1..=max_per_request 内直接拒绝；
/// 剩余额度为 0 拒绝；否则按剩余额度截断。
pub(crate) fn purchase_allowance(
    cap: i64,
    already: i64,
    requested: i64,
    max_per_request: i64,
) -> Result<i64, AppError> {
    if requested < 1 || requested > max_per_request {
        return Err(AppError::ValidationError(format!(
            "Quantity must be between 1 and {max_per_request}"
        )));
    }

    let allowance = (cap - already).max(0);
    if allowance == 0 {
        return Err(AppError::CapExceeded(
            "You've used all your purchase entries this week".to_string(),
        ));
    }

    Ok(requested.min(allowance))
}

/// 概率展示：用户券数 / 池子总数。池子为空按 1 算避免除零。
pub(crate) fn odds_percentage(user_total: i64, pool_total: i64) -> (i64, String) {
    let pool = pool_total.max(1);
    let pct = user_total as f64 / pool as f64 * 100.0;
    (pool, format!("{pct:.4}%"))
}

pub(crate) fn remaining_allowance(
    breakdown: &EntryBreakdown,
    cfg: &LotteryConfig,
) -> RemainingAllowance {
    RemainingAllowance {
        can_purchase: (cfg.purchase_cap - breakdown.purchased).max(0),
        can_visit: (cfg.visit_cap - breakdown.visit).max(0),
        can_checkin: breakdown.checkin == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: EntryCategory, quantity: i32) -> entries::Model {
        row_for(7, category, quantity)
    }

    fn row_for(user: u128, category: EntryCategory, quantity: i32) -> entries::Model {
        entries::Model {
            id: 0,
            drawing_id: 1,
            user_id: Uuid::from_u128(user),
            category,
            quantity,
            nice_spent: None,
            visit_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_base_entry_granted_only_on_first_touch() {
        // 第一次（没有任何券）可发；重复调用因已有券而空操作
        assert_eq!(base_entry_refusal(true, 0), None);
        assert_eq!(base_entry_refusal(true, 1), Some("entries_exist"));
    }

    #[test]
    fn test_base_entry_forfeited_once_any_category_exists() {
        // 既定行为：任何类别的券都会挡掉免费基础券，
        // 先购券的用户这一周拿不到免费券
        assert_eq!(base_entry_refusal(true, 3), Some("entries_exist"));
        assert_eq!(base_entry_refusal(false, 0), Some("auto_entry_not_enabled"));
    }

    #[test]
    fn test_breakdown_sums_rows_per_category() {
        let rows = vec![
            row(EntryCategory::Base, 1),
            row(EntryCategory::Purchased, 3),
            row(EntryCategory::Purchased, 2),
            row(EntryCategory::Visit, 1),
            row(EntryCategory::Checkin, 2),
        ];
        let b = breakdown_of(&rows);
        assert_eq!(b.base, 1);
        assert_eq!(b.purchased, 5);
        assert_eq!(b.visit, 1);
        assert_eq!(b.checkin, 2);
        assert_eq!(b.total(), 9);
    }

    #[test]
    fn test_aggregate_totals_counts_distinct_users() {
        let rows = vec![
            row_for(1, EntryCategory::Base, 1),
            row_for(1, EntryCategory::Purchased, 4),
            row_for(2, EntryCategory::Visit, 1),
            row_for(3, EntryCategory::Checkin, 2),
        ];
        assert_eq!(aggregate_totals(&rows), (8, 3));
        // 重算是幂等的：同样的流水永远得出同样的聚合
        assert_eq!(aggregate_totals(&rows), (8, 3));
        assert_eq!(aggregate_totals(&[]), (0, 0));
    }

    #[test]
    fn test_purchase_allowance_truncates_to_cap() {
        // 已购 8/10，再要 5 → 只发 2
        assert_eq!(purchase_allowance(10, 8, 5, 10).unwrap(), 2);
        // 额度充足按请求发
        assert_eq!(purchase_allowance(10, 2, 5, 10).unwrap(), 5);
        assert_eq!(purchase_allowance(10, 0, 10, 10).unwrap(), 10);
    }

    #[test]
    fn test_purchase_allowance_rejects_when_cap_used_up() {
        let err = purchase_allowance(10, 10, 1, 10).unwrap_err();
        assert!(matches!(err, AppError::CapExceeded(_)));
        // 超额状态同样拒绝（容忍的并发竞态可能造成 already > cap）
        let err = purchase_allowance(10, 11, 1, 10).unwrap_err();
        assert!(matches!(err, AppError::CapExceeded(_)));
    }

    #[test]
    fn test_purchase_allowance_validates_request_range() {
        assert!(matches!(
            purchase_allowance(10, 0, 0, 10).unwrap_err(),
            AppError::ValidationError(_)
        ));
        assert!(matches!(
            purchase_allowance(10, 0, 11, 10).unwrap_err(),
            AppError::ValidationError(_)
        ));
        assert!(matches!(
            purchase_allowance(10, 0, -3, 10).unwrap_err(),
            AppError::ValidationError(_)
        ));
    }

    #[test]
    fn test_odds_percentage_formats_four_decimals() {
        let (pool, pct) = odds_percentage(3, 400);
        assert_eq!(pool, 400);
        assert_eq!(pct, "0.7500%");

        let (_, pct) = odds_percentage(1, 3);
        assert_eq!(pct, "33.3333%");

        let (_, pct) = odds_percentage(7, 7);
        assert_eq!(pct, "100.0000%");
    }

    #[test]
    fn test_odds_percentage_empty_pool_counts_as_one() {
        // 池子为空时分母按 1 算，避免除零
        let (pool, pct) = odds_percentage(0, 0);
        assert_eq!(pool, 1);
        assert_eq!(pct, "0.0000%");
    }

    #[test]
    fn test_remaining_allowance_floors_at_zero() {
        let cfg = LotteryConfig::default();
        let b = EntryBreakdown {
            base: 1,
            purchased: 12,
            visit: 3,
            checkin: 2,
        };
        let r = remaining_allowance(&b, &cfg);
        assert_eq!(r.can_purchase, 0);
        assert_eq!(r.can_visit, 0);
        assert!(!r.can_checkin);

        let fresh = remaining_allowance(&EntryBreakdown::default(), &cfg);
        assert_eq!(fresh.can_purchase, 10);
        assert_eq!(fresh.can_visit, 3);
        assert!(fresh.can_checkin);
    }
}
