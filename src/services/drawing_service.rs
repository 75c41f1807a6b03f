use crate::entities::{DrawingStatus, PrizeTier, PrizeType, drawing_entity as drawings};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Datelike, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

/// 抽奖期生命周期管理: upcoming -> active -> drawn，取消为管理操作。
/// 置为 drawn 不在这里做，那是开奖执行器的事。
#[derive(Clone)]
pub struct DrawingService {
    pool: DatabaseConnection,
}

impl DrawingService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 当前抽奖期: active 状态里 draw_date 最近的一期。
    /// 正常只会有一期 active，取最近的一期是对脏数据的容忍而非约定。
    pub async fn current_drawing(&self) -> AppResult<Option<drawings::Model>> {
        let drawing = drawings::Entity::find()
            .filter(drawings::Column::Status.eq(DrawingStatus::Active))
            .order_by_asc(drawings::Column::DrawDate)
            .one(&self.pool)
            .await?;
        Ok(drawing)
    }

    pub async fn require_current(&self) -> AppResult<drawings::Model> {
        self.current_drawing()
            .await?
            .ok_or(AppError::NoActiveDrawing)
    }

    /// 本周抽奖期建期（调度器每小时调一次，幂等）。
    /// 周起始为周一 00:00 UTC，开奖定在周日 20:00 UTC；
    /// 月初周 / 季初周奖品升档。本周已有期则原样返回 (created=false)，
    /// week_start_date 唯一索引兜底并发建期。
    pub async fn create_weekly_drawing(&self) -> AppResult<(drawings::Model, bool)> {
        let now = Utc::now();
        let week_start = week_start_of(now);

        if let Some(existing) = drawings::Entity::find()
            .filter(drawings::Column::WeekStartDate.eq(week_start))
            .one(&self.pool)
            .await?
        {
            return Ok((existing, false));
        }

        let tier = prize_tier_for(now, week_start);
        let (description, value) = prize_for_tier(tier);

        let drawing = drawings::ActiveModel {
            week_start_date: Set(week_start),
            draw_date: Set(draw_date_for(week_start)),
            status: Set(DrawingStatus::Active),
            prize_tier: Set(tier),
            prize_description: Set(description.to_string()),
            prize_value: Set(value),
            prize_type: Set(PrizeType::Custom),
            auto_entry_enabled: Set(true),
            auto_entry_quantity: Set(1),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok((drawing, true))
    }

    /// 取消抽奖期（管理操作），仅 upcoming / active 可取消
    pub async fn cancel_drawing(&self, drawing_id: i64) -> AppResult<drawings::Model> {
        let drawing = drawings::Entity::find_by_id(drawing_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Drawing {drawing_id} not found")))?;

        match drawing.status {
            DrawingStatus::Upcoming | DrawingStatus::Active => {}
            status => {
                return Err(AppError::NotActive(format!(
                    "Drawing {drawing_id} cannot be cancelled from status {status:?}"
                )));
            }
        }

        let mut am = drawing.into_active_model();
        am.status = Set(DrawingStatus::Cancelled);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?)
    }

    /// 已到期未开奖的期（开奖调度循环查询）
    pub async fn find_due_drawing(&self) -> AppResult<Option<drawings::Model>> {
        let drawing = drawings::Entity::find()
            .filter(drawings::Column::Status.eq(DrawingStatus::Active))
            .filter(drawings::Column::DrawDate.lte(Utc::now()))
            .order_by_asc(drawings::Column::DrawDate)
            .one(&self.pool)
            .await?;
        Ok(drawing)
    }
}

/// 周起始: 所在周的周一 00:00 UTC
pub(crate) fn week_start_of(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_from_monday);
    monday
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// 开奖时间: 周起始 + 6 天，当天 20:00 UTC（周日晚）
pub(crate) fn draw_date_for(week_start: DateTime<Utc>) -> DateTime<Utc> {
    (week_start.date_naive() + Duration::days(6))
        .and_hms_opt(20, 0, 0)
        .expect("20:00 is always a valid time")
        .and_utc()
}

/// 奖品档位: 当月第一周升为 monthly，季度首月的第一周升为 quarterly。
/// "第一周" = 包含当月 1 号的那个周一起始周。
pub(crate) fn prize_tier_for(now: DateTime<Utc>, week_start: DateTime<Utc>) -> PrizeTier {
    let first_week_of_month = week_start.month() != now.month() || week_start.day() == 1;
    let quarter_start_month = (now.month() - 1) % 3 == 0; // 1 / 4 / 7 / 10 月

    if first_week_of_month && quarter_start_month {
        PrizeTier::Quarterly
    } else if first_week_of_month {
        PrizeTier::Monthly
    } else {
        PrizeTier::Standard
    }
}

pub(crate) fn prize_for_tier(tier: PrizeTier) -> (&'static str, i64) {
    match tier {
        PrizeTier::Standard => ("$50 Dining Voucher", 50),
        PrizeTier::Monthly => ("$100 Dining Voucher", 100),
        PrizeTier::Quarterly => ("$500 Dining Voucher", 500),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_week_start_is_monday_midnight() {
        // 2026-08-06 是周四，周起始应为 08-03 周一零点
        let ws = week_start_of(at(2026, 8, 6, 15));
        assert_eq!(ws, at(2026, 8, 3, 0));
        // 周一当天属于本周
        assert_eq!(week_start_of(at(2026, 8, 3, 0)), at(2026, 8, 3, 0));
        // 周日仍属于上周一开始的那周
        assert_eq!(week_start_of(at(2026, 8, 9, 23)), at(2026, 8, 3, 0));
    }

    #[test]
    fn test_draw_date_is_sunday_evening() {
        let draw = draw_date_for(at(2026, 8, 3, 0));
        assert_eq!(draw, at(2026, 8, 9, 20));
    }

    #[test]
    fn test_prize_tier_standard_mid_month() {
        let now = at(2026, 8, 6, 12);
        assert_eq!(prize_tier_for(now, week_start_of(now)), PrizeTier::Standard);
    }

    #[test]
    fn test_prize_tier_monthly_first_week() {
        // 2026-06-01 恰为周一，当周是六月第一周
        let now = at(2026, 6, 3, 12);
        assert_eq!(week_start_of(now), at(2026, 6, 1, 0));
        assert_eq!(prize_tier_for(now, week_start_of(now)), PrizeTier::Monthly);
    }

    #[test]
    fn test_prize_tier_quarterly_first_week_of_quarter() {
        // 2026-01-01 是周四，周一落在上年 12-29，但它仍是一月第一周
        let now = at(2026, 1, 1, 12);
        assert_eq!(week_start_of(now), at(2025, 12, 29, 0));
        assert_eq!(
            prize_tier_for(now, week_start_of(now)),
            PrizeTier::Quarterly
        );

        // 七月同理
        let july = at(2026, 7, 2, 12);
        assert_eq!(prize_tier_for(july, week_start_of(july)), PrizeTier::Quarterly);
    }

    #[test]
    fn test_prize_values_per_tier() {
        assert_eq!(prize_for_tier(PrizeTier::Standard), ("$50 Dining Voucher", 50));
        assert_eq!(prize_for_tier(PrizeTier::Monthly), ("$100 Dining Voucher", 100));
        assert_eq!(
            prize_for_tier(PrizeTier::Quarterly),
            ("$500 Dining Voucher", 500)
        );
    }
}
