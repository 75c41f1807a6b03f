//! Background scheduled tasks for the application.
//!
//! Two recurring jobs drive the lottery lifecycle: opening the weekly
//! drawing and executing draws once their scheduled time has passed.
//! Call `spawn_all` once during startup to launch them.

use crate::services::{DrawService, DrawingService};

/// Spawn all background tasks.
///
/// Notes
/// - Both jobs are idempotent in their services (create returns the existing
///   drawing, execute refuses non-active drawings), so at-least-once
///   scheduling is safe.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(drawing_service: DrawingService, draw_service: DrawService) {
    // 每小时确保本周抽奖期存在
    {
        let svc = drawing_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.create_weekly_drawing().await {
                    Ok((drawing, true)) => log::info!(
                        "Weekly drawing {} opened, draw scheduled at {}",
                        drawing.id,
                        drawing.draw_date
                    ),
                    Ok((_, false)) => {}
                    Err(e) => log::error!("Failed to ensure weekly drawing: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });
    }

    // 每分钟检查到期未开奖的期并执行开奖
    {
        let svc = draw_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.execute_due().await {
                    Ok(Some(result)) => log::info!(
                        "Drawing {} executed: winner {} holds ticket {} of {}",
                        result.drawing_id,
                        result.winner_user_id,
                        result.winning_ticket,
                        result.total_tickets
                    ),
                    Ok(None) => {}
                    Err(e) => log::error!("Failed to execute due drawing: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }
}
