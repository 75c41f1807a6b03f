use crate::config::Config;
use crate::error::AppError;
use crate::models::*;
use crate::services::{DrawService, DrawingService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 调度/运维端点的共享密钥校验（Authorization: Bearer <cron.secret>）。
/// 这些端点不走用户身份，调用方是外部调度器或运维脚本。
fn verify_cron_secret(req: &HttpRequest, config: &Config) -> Result<(), AppError> {
    let expected = format!("Bearer {}", config.cron.secret);
    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != expected {
        return Err(AppError::AuthError("Invalid cron secret".to_string()));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/internal/cron/start-weekly",
    tag = "internal",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "本周抽奖期（已存在则原样返回）", body = CreateDrawingResponse),
        (status = 401, description = "调度密钥错误")
    )
)]
/// 开启本周抽奖期。幂等：本周已有期时返回已有的那期，created=false。
pub async fn start_weekly(
    service: web::Data<DrawingService>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = verify_cron_secret(&req, &config) {
        return Ok(e.error_response());
    }

    match service.create_weekly_drawing().await {
        Ok((drawing, created)) => {
            let data = CreateDrawingResponse {
                drawing: drawing.into(),
                created,
            };
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/internal/cron/execute-drawing",
    tag = "internal",
    request_body = ExecuteDrawingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开奖结果", body = ExecuteDrawingResponse),
        (status = 401, description = "调度密钥错误"),
        (status = 409, description = "该期已开奖/已取消，或无人参与")
    )
)]
/// 开奖。带 drawing_id 开指定期；不带则开最早一期已到期的。
/// 对已开奖的期重复调用返回 DRAWING_NOT_ACTIVE，不会产生第二个中奖者。
pub async fn execute_drawing(
    service: web::Data<DrawService>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<ExecuteDrawingRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = verify_cron_secret(&req, &config) {
        return Ok(e.error_response());
    }

    match body.drawing_id {
        Some(drawing_id) => match service.execute(drawing_id).await {
            Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
            Err(e) => Ok(e.error_response()),
        },
        None => match service.execute_due().await {
            Ok(Some(data)) => {
                Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
            }
            Ok(None) => Ok(HttpResponse::Ok()
                .json(json!({ "success": true, "message": "No drawing ready to execute" }))),
            Err(e) => Ok(e.error_response()),
        },
    }
}

#[utoipa::path(
    post,
    path = "/internal/lottery/cancel-drawing",
    tag = "internal",
    request_body = CancelDrawingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "取消成功", body = DrawingResponse),
        (status = 401, description = "调度密钥错误"),
        (status = 409, description = "该期状态不允许取消")
    )
)]
/// 取消抽奖期（运维操作），仅 upcoming / active 状态可取消
pub async fn cancel_drawing(
    service: web::Data<DrawingService>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<CancelDrawingRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = verify_cron_secret(&req, &config) {
        return Ok(e.error_response());
    }

    match service.cancel_drawing(body.drawing_id).await {
        Ok(drawing) => {
            let data: DrawingResponse = drawing.into();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置（挂在 /internal 下）
pub fn cron_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cron")
            .route("/start-weekly", web::post().to(start_weekly))
            .route("/execute-drawing", web::post().to(execute_drawing)),
    )
    .service(web::scope("/lottery").route("/cancel-drawing", web::post().to(cancel_drawing)));
}
