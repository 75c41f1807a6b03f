use sea_orm_migration::prelude::*;

/// Lottery Drawings (每周抽奖期)
#[derive(DeriveIden)]
enum LotteryDrawings {
    Table,
    Id,
    WeekStartDate,
    DrawDate,
    Status,
    PrizeTier,
    PrizeDescription,
    PrizeValue,
    PrizeType,
    AutoEntryEnabled,
    AutoEntryQuantity,
    TotalEntries,
    TotalParticipants,
    WinningTicketNumber,
    WinnerUserId,
    RandomSeed,
    DrawnAt,
    CreatedAt,
    UpdatedAt,
}

/// Lottery Entries (抽奖券流水，只增不改)
#[derive(DeriveIden)]
enum LotteryEntries {
    Table,
    Id,
    DrawingId,
    UserId,
    Category,
    Quantity,
    NiceSpent,
    VisitId,
    CreatedAt,
}

/// Lottery Winners (开奖结果)
#[derive(DeriveIden)]
enum LotteryWinners {
    Table,
    Id,
    DrawingId,
    UserId,
    PrizeDescription,
    PrizeValue,
    VoucherCode,
    VoucherExpiresAt,
    Notified,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 三张核心表:
/// - lottery_drawings: 每周一期，week_start_date 唯一（防止调度器重复建期）
/// - lottery_entries: 追加式流水，visit_id 唯一（同一到店记录只能换一次奖励券，
///   Postgres 唯一索引对 NULL 不生效，其它类别不受影响）
/// - lottery_winners: drawing_id 唯一（每期最多一个中奖记录）
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 抽奖期表
        manager
            .create_table(
                Table::create()
                    .table(LotteryDrawings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotteryDrawings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::WeekStartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::DrawDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::PrizeTier)
                            .string_len(20)
                            .not_null()
                            .default("standard"),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::PrizeDescription)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::PrizeValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::PrizeType)
                            .string_len(20)
                            .not_null()
                            .default("custom"),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::AutoEntryEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::AutoEntryQuantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::TotalEntries)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::TotalParticipants)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::WinningTicketNumber)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(LotteryDrawings::WinnerUserId).uuid().null())
                    .col(
                        ColumnDef::new(LotteryDrawings::RandomSeed)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::DrawnAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(LotteryDrawings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 每周只允许一期（调度器至少一次语义下的防重）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_drawings_week_start_unique")
                    .table(LotteryDrawings::Table)
                    .col(LotteryDrawings::WeekStartDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 调度查询: 活跃且到期的抽奖期
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_drawings_status_draw_date")
                    .table(LotteryDrawings::Table)
                    .col(LotteryDrawings::Status)
                    .col(LotteryDrawings::DrawDate)
                    .to_owned(),
            )
            .await?;

        // 抽奖券流水表
        manager
            .create_table(
                Table::create()
                    .table(LotteryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotteryEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LotteryEntries::DrawingId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotteryEntries::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(LotteryEntries::Category)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryEntries::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotteryEntries::NiceSpent).big_integer().null())
                    .col(ColumnDef::new(LotteryEntries::VisitId).uuid().null())
                    .col(
                        ColumnDef::new(LotteryEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 用户在某期的流水查询（限额统计、个人明细）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_entries_drawing_user")
                    .table(LotteryEntries::Table)
                    .col(LotteryEntries::DrawingId)
                    .col(LotteryEntries::UserId)
                    .to_owned(),
            )
            .await?;

        // 同一到店记录只能产生一条奖励券
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_entries_visit_unique")
                    .table(LotteryEntries::Table)
                    .col(LotteryEntries::VisitId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(LotteryEntries::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_lottery_entry_drawing")
                            .from_tbl(LotteryEntries::Table)
                            .from_col(LotteryEntries::DrawingId)
                            .to_tbl(LotteryDrawings::Table)
                            .to_col(LotteryDrawings::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 开奖结果表
        manager
            .create_table(
                Table::create()
                    .table(LotteryWinners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotteryWinners::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::DrawingId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotteryWinners::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(LotteryWinners::PrizeDescription)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::PrizeValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::VoucherCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::VoucherExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::Notified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LotteryWinners::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 每期最多一个中奖记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_winners_drawing_unique")
                    .table(LotteryWinners::Table)
                    .col(LotteryWinners::DrawingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 兑换码唯一，生成时查重依赖此索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_winners_voucher_unique")
                    .table(LotteryWinners::Table)
                    .col(LotteryWinners::VoucherCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(LotteryWinners::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_lottery_winner_drawing")
                            .from_tbl(LotteryWinners::Table)
                            .from_col(LotteryWinners::DrawingId)
                            .to_tbl(LotteryDrawings::Table)
                            .to_col(LotteryDrawings::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：中奖 -> 流水 -> 抽奖期
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LotteryWinners::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LotteryEntries::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LotteryDrawings::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
