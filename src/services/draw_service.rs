use crate::config::LotteryConfig;
use crate::entities::{
    DrawingStatus, PrizeType, drawing_entity as drawings, entry_entity as entries,
    winner_entity as winners,
};
use crate::error::{AppError, AppResult};
use crate::external::{NotificationApi, PointsApi};
use crate::models::{ExecuteDrawingResponse, PaginatedResponse, PaginationParams, WinnerResponse, WinnersQuery};
use crate::services::DrawingService;
use crate::utils::generate_voucher_code;
use chrono::{Duration, Utc};
use rand::RngCore;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, UpdateResult,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 开奖执行器：加权随机选出中奖者，写中奖记录并翻转抽奖期状态，
/// 然后兑付奖品、通知用户。
///
/// 状态翻转是条件更新（仅 active 时生效），与中奖记录同一事务提交，
/// 所以重复调用/并发调用最多只会产生一个中奖者，后到的拿到 NotActive。
#[derive(Clone)]
pub struct DrawService {
    pool: DatabaseConnection,
    drawing_service: DrawingService,
    points: PointsApi,
    notifications: NotificationApi,
    cfg: LotteryConfig,
}

impl DrawService {
    pub fn new(
        pool: DatabaseConnection,
        drawing_service: DrawingService,
        points: PointsApi,
        notifications: NotificationApi,
        cfg: LotteryConfig,
    ) -> Self {
        Self {
            pool,
            drawing_service,
            points,
            notifications,
            cfg,
        }
    }

    /// 开奖。
    ///
    /// 流程:
    /// 1. 校验状态为 active（天然幂等：已开奖的期直接 NotActive）
    /// 2. 读全部流水，按用户聚合出票数
    /// 3. 随机抽一张票，票落在谁的区间谁中奖
    /// 4. 条件翻转状态 + 写中奖记录，同一事务提交
    /// 5. 兑付与通知在提交后进行，失败不回滚开奖，可独立重试
    ///
    /// 无人参与时返回 NoEntries，状态保持 active 不动。
    pub async fn execute(&self, drawing_id: i64) -> AppResult<ExecuteDrawingResponse> {
        let txn = self.pool.begin().await?;

        let drawing = drawings::Entity::find_by_id(drawing_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Drawing {drawing_id} not found")))?;

        ensure_drawable(drawing_id, drawing.status)?;

        let rows = entries::Entity::find()
            .filter(entries::Column::DrawingId.eq(drawing_id))
            .all(&txn)
            .await?;

        let totals = user_totals(&rows);
        let total_tickets: i64 = totals.values().sum();
        if total_tickets == 0 {
            return Err(AppError::NoEntries);
        }

        // 与线上一致：记下随机数原值做审计，取模落到票区间
        let seed = rand::thread_rng().next_u32();
        let winning_ticket = (seed as i64) % total_tickets;
        let winner_user_id = winner_for_ticket(&totals, winning_ticket)
            .expect("winning ticket below total always has a holder");

        // 条件翻转：0 行受影响说明已被并发开奖，整体放弃
        let update: UpdateResult = drawings::Entity::update_many()
            .col_expr(drawings::Column::Status, Expr::value(DrawingStatus::Drawn))
            .col_expr(
                drawings::Column::WinningTicketNumber,
                Expr::value(winning_ticket),
            )
            .col_expr(drawings::Column::WinnerUserId, Expr::value(winner_user_id))
            .col_expr(drawings::Column::RandomSeed, Expr::value(seed.to_string()))
            .col_expr(drawings::Column::DrawnAt, Expr::value(Utc::now()))
            .col_expr(drawings::Column::TotalEntries, Expr::value(total_tickets))
            .col_expr(
                drawings::Column::TotalParticipants,
                Expr::value(totals.len() as i64),
            )
            .col_expr(drawings::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(drawings::Column::Id.eq(drawing_id))
            .filter(drawings::Column::Status.eq(DrawingStatus::Active))
            .exec(&txn)
            .await?;

        if update.rows_affected != 1 {
            return Err(AppError::NotActive(format!(
                "Drawing {drawing_id} was drawn concurrently"
            )));
        }

        let voucher_code = self.unique_voucher_code(&txn).await?;
        winners::ActiveModel {
            drawing_id: Set(drawing_id),
            user_id: Set(winner_user_id),
            prize_description: Set(drawing.prize_description.clone()),
            prize_value: Set(drawing.prize_value),
            voucher_code: Set(voucher_code.clone()),
            voucher_expires_at: Set(Utc::now() + Duration::days(self.cfg.voucher_validity_days)),
            notified: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Drawing {drawing_id} drawn: ticket {winning_ticket} of {total_tickets}, winner {winner_user_id}"
        );

        // 兑付与通知：中奖记录已落盘，这里失败只记日志，可独立重试
        if let Err(e) = self.settle_prize(&drawing, winner_user_id).await {
            log::error!("Failed to settle prize for drawing {drawing_id}: {e:?}");
        }
        if let Err(e) = self
            .notify_winner(&drawing, winner_user_id, &voucher_code)
            .await
        {
            log::error!("Failed to notify winner of drawing {drawing_id}: {e:?}");
        }

        Ok(ExecuteDrawingResponse {
            drawing_id,
            winner_user_id,
            total_tickets,
            winning_ticket,
        })
    }

    /// 执行最早一期已到期的开奖（调度循环入口）。
    /// 没有到期的期、或到期但无人参与时返回 None。
    pub async fn execute_due(&self) -> AppResult<Option<ExecuteDrawingResponse>> {
        let Some(due) = self.drawing_service.find_due_drawing().await? else {
            return Ok(None);
        };

        match self.execute(due.id).await {
            Ok(result) => Ok(Some(result)),
            Err(AppError::NoEntries) => {
                log::warn!("Drawing {} is due but has no entries; leaving it active", due.id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 往期中奖公示（分页，新的在前）
    pub async fn list_winners(
        &self,
        query: &WinnersQuery,
    ) -> AppResult<PaginatedResponse<WinnerResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();

        let base_query = winners::Entity::find();

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items_models = base_query
            .order_by(winners::Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<WinnerResponse> = items_models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(20),
            total,
        ))
    }

    /// 奖品兑付：积分类奖品直接充积分；custom 类奖品由兑换码线下核销，无需额外动作
    async fn settle_prize(&self, drawing: &drawings::Model, winner: Uuid) -> AppResult<()> {
        match drawing.prize_type {
            PrizeType::Points => {
                self.points
                    .award(winner, drawing.prize_value, "lottery_prize")
                    .await?;
            }
            PrizeType::Custom => {}
        }
        Ok(())
    }

    async fn notify_winner(
        &self,
        drawing: &drawings::Model,
        winner: Uuid,
        voucher_code: &str,
    ) -> AppResult<()> {
        let body = format!(
            "You won this week's lottery: {}! Your voucher code is {voucher_code}.",
            drawing.prize_description
        );
        let url = format!("/lottery/winner/{}", drawing.id);
        self.notifications
            .notify_user(winner, "You're this week's winner!", &body, &url)
            .await?;

        // 送达标记尽力而为，失败下次补偿任务可重发
        winners::Entity::update_many()
            .col_expr(winners::Column::Notified, Expr::value(true))
            .filter(winners::Column::DrawingId.eq(drawing.id))
            .exec(&self.pool)
            .await?;

        Ok(())
    }

    /// 生成未被用过的兑换码（唯一索引兜底并发撞码）
    async fn unique_voucher_code<C: ConnectionTrait>(&self, conn: &C) -> Result<String, DbErr> {
        loop {
            let code = generate_voucher_code();
            let exists = winners::Entity::find()
                .filter(winners::Column::VoucherCode.eq(code.clone()))
                .count(conn)
                .await?;
            if exists == 0 {
                return Ok(code);
            }
        }
    }
}

/// 开奖前置状态检查：只有 active 的期能开。
/// 已开奖的期再次调用落在这里，这就是调度器重复触发时的幂等保证。
pub(crate) fn ensure_drawable(drawing_id: i64, status: DrawingStatus) -> Result<(), AppError> {
    if status != DrawingStatus::Active {
        return Err(AppError::NotActive(format!(
            "Drawing {drawing_id} status is {status:?}"
        )));
    }
    Ok(())
}

/// 按用户聚合票数。BTreeMap 保证遍历顺序稳定，
/// 同一 (seed, 流水) 输入永远得到同一个中奖者。
pub(crate) fn user_totals(rows: &[entries::Model]) -> BTreeMap<Uuid, i64> {
    let mut totals: BTreeMap<Uuid, i64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.user_id).or_insert(0) += row.quantity as i64;
    }
    totals
}

/// 加权选择：把 [0, total) 的票号按聚合顺序切成连续区间，
/// 票落在谁的区间谁中奖。P(用户中奖) = 用户票数 / 总票数，精确成立。
pub(crate) fn winner_for_ticket(totals: &BTreeMap<Uuid, i64>, ticket: i64) -> Option<Uuid> {
    let mut cumulative = 0;
    for (user_id, quantity) in totals {
        cumulative += quantity;
        if ticket < cumulative {
            return Some(*user_id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntryCategory;
    use rand::Rng;

    fn entry(user: u128, quantity: i32) -> entries::Model {
        entries::Model {
            id: 0,
            drawing_id: 1,
            user_id: Uuid::from_u128(user),
            category: EntryCategory::Purchased,
            quantity,
            nice_spent: None,
            visit_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_only_active_drawings_are_drawable() {
        assert!(ensure_drawable(1, DrawingStatus::Active).is_ok());
        // 二次开奖：状态已是 drawn，拿到 NotActive，不会产生第二个中奖者
        assert!(matches!(
            ensure_drawable(1, DrawingStatus::Drawn).unwrap_err(),
            AppError::NotActive(_)
        ));
        assert!(matches!(
            ensure_drawable(1, DrawingStatus::Cancelled).unwrap_err(),
            AppError::NotActive(_)
        ));
        assert!(matches!(
            ensure_drawable(1, DrawingStatus::Upcoming).unwrap_err(),
            AppError::NotActive(_)
        ));
    }

    #[test]
    fn test_user_totals_sums_rows_per_user() {
        // 同一用户多条流水求和后参与抽签，等价于按行走票
        let rows = vec![entry(1, 1), entry(2, 2), entry(2, 1), entry(3, 5)];
        let totals = user_totals(&rows);
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[&Uuid::from_u128(1)], 1);
        assert_eq!(totals[&Uuid::from_u128(2)], 3);
        assert_eq!(totals[&Uuid::from_u128(3)], 5);
    }

    #[test]
    fn test_ticket_ranges_are_contiguous() {
        let totals = user_totals(&[entry(1, 1), entry(2, 3)]);
        // from_u128 保序：票 0 归 u1，票 1..4 归 u2
        assert_eq!(winner_for_ticket(&totals, 0), Some(Uuid::from_u128(1)));
        for t in 1..4 {
            assert_eq!(winner_for_ticket(&totals, t), Some(Uuid::from_u128(2)));
        }
        // 超出总票数没有持有者
        assert_eq!(winner_for_ticket(&totals, 4), None);
        assert_eq!(winner_for_ticket(&BTreeMap::new(), 0), None);
    }

    #[test]
    fn test_single_participant_always_wins() {
        let totals = user_totals(&[entry(9, 4)]);
        for t in 0..4 {
            assert_eq!(winner_for_ticket(&totals, t), Some(Uuid::from_u128(9)));
        }
    }

    #[test]
    fn test_majority_holder_is_not_special_cased() {
        // 一个用户持有 >50% 票也走同一条路径
        let totals = user_totals(&[entry(1, 9), entry(2, 1)]);
        assert_eq!(winner_for_ticket(&totals, 8), Some(Uuid::from_u128(1)));
        assert_eq!(winner_for_ticket(&totals, 9), Some(Uuid::from_u128(2)));
    }

    #[test]
    fn test_weighted_fairness_converges() {
        // {u1: 1, u2: 3} 抽 10 万次，u2 胜率应收敛到 75% 附近
        // (理论标准差约 0.14%，1% 容差在 7 个标准差之外，不会偶发失败)
        let totals = user_totals(&[entry(1, 1), entry(2, 3)]);
        let total_tickets: i64 = totals.values().sum();

        let mut rng = rand::thread_rng();
        let runs = 100_000;
        let mut u2_wins = 0u32;
        for _ in 0..runs {
            let ticket = rng.gen_range(0..total_tickets);
            if winner_for_ticket(&totals, ticket) == Some(Uuid::from_u128(2)) {
                u2_wins += 1;
            }
        }

        let rate = f64::from(u2_wins) / f64::from(runs);
        assert!(
            (rate - 0.75).abs() < 0.01,
            "u2 win rate {rate} should converge to 0.75"
        );
    }
}
