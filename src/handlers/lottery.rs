use crate::error::AppError;
use crate::models::*;
use crate::services::{DrawService, EntryService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

/// 从请求扩展中获取用户ID（身份中间件解析网关头后注入）
fn get_user_id_from_request(req: &HttpRequest) -> Option<Uuid> {
    req.extensions().get::<Uuid>().copied()
}

fn require_user_id(req: &HttpRequest) -> Result<Uuid, AppError> {
    get_user_id_from_request(req).ok_or_else(|| AppError::AuthError("Missing user identity".into()))
}

#[utoipa::path(
    get,
    path = "/lottery/current",
    tag = "lottery",
    responses(
        (status = 200, description = "当前抽奖期与用户视角数据", body = CurrentLotteryResponse),
        (status = 404, description = "当前没有进行中的抽奖期")
    )
)]
/// 当前抽奖期：奖品、池子规模、用户券明细、概率与各类剩余额度。
/// 未登录也可访问，用户相关字段为全零。
pub async fn get_current(
    service: web::Data<EntryService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    match service.get_current(user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/ensure-base-entry",
    tag = "lottery",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "发放结果（已有券时 granted=false）", body = EnsureBaseEntryResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "当前没有进行中的抽奖期")
    )
)]
/// 免费基础券：本期首次参与（任何类别都还没有券）时发放一次，
/// 重复调用是无害的空操作
pub async fn ensure_base_entry(
    service: web::Data<EntryService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(uid) => uid,
        Err(e) => return Ok(e.error_response()),
    };
    match service.ensure_base_entry(user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/purchase-entries",
    tag = "lottery",
    request_body = PurchaseEntriesRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "购买成功（数量可能被剩余额度截断）", body = PurchaseEntriesResponse),
        (status = 400, description = "数量非法 / 额度用尽 / 积分不足"),
        (status = 401, description = "未授权")
    )
)]
/// 用 Nice 积分购买抽奖券，每期每人限 10 张
pub async fn purchase_entries(
    service: web::Data<EntryService>,
    req: HttpRequest,
    body: web::Json<PurchaseEntriesRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(uid) => uid,
        Err(e) => return Ok(e.error_response()),
    };
    match service.purchase_entries(user_id, body.quantity).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/visit-bonus",
    tag = "lottery",
    request_body = VisitBonusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "奖励发放成功", body = BonusGrantResponse),
        (status = 400, description = "到店记录校验未通过"),
        (status = 401, description = "未授权"),
        (status = 409, description = "该到店记录已兑换过")
    )
)]
/// 到店奖励券：一次真实到店消费换一张券，每期限 3 张
pub async fn visit_bonus(
    service: web::Data<EntryService>,
    req: HttpRequest,
    body: web::Json<VisitBonusRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(uid) => uid,
        Err(e) => return Ok(e.error_response()),
    };
    match service.award_visit_bonus(user_id, body.visit_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/checkin-bonus",
    tag = "lottery",
    request_body = CheckinBonusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "奖励发放成功", body = BonusGrantResponse),
        (status = 400, description = "门店消费校验未通过"),
        (status = 401, description = "未授权"),
        (status = 409, description = "本期打卡奖励已领取")
    )
)]
/// 门店打卡奖励券：本期内在该门店有真实消费即可领取，每期一次
pub async fn checkin_bonus(
    service: web::Data<EntryService>,
    req: HttpRequest,
    body: web::Json<CheckinBonusRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(uid) => uid,
        Err(e) => return Ok(e.error_response()),
    };
    match service.award_checkin_bonus(user_id, body.location_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/my-entries",
    tag = "lottery",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户本期券明细", body = MyEntriesResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "当前没有进行中的抽奖期")
    )
)]
/// 用户在当前期的全部券流水
pub async fn my_entries(
    service: web::Data<EntryService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(uid) => uid,
        Err(e) => return Ok(e.error_response()),
    };
    match service.my_entries(user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/winners",
    tag = "lottery",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "往期中奖公示（不含兑换码）", body = WinnerPageResponse)
    )
)]
/// 往期中奖公示（倒序分页）
pub async fn winners(
    service: web::Data<DrawService>,
    query: web::Query<WinnersQuery>,
) -> Result<HttpResponse> {
    match service.list_winners(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn lottery_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lottery")
            .route("/current", web::get().to(get_current))
            .route("/ensure-base-entry", web::post().to(ensure_base_entry))
            .route("/purchase-entries", web::post().to(purchase_entries))
            .route("/visit-bonus", web::post().to(visit_bonus))
            .route("/checkin-bonus", web::post().to(checkin_bonus))
            .route("/my-entries", web::get().to(my_entries))
            .route("/winners", web::get().to(winners)),
    );
}
