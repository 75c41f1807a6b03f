use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{DrawingStatus, EntryCategory, PrizeTier, PrizeType};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::lottery::get_current,
        handlers::lottery::ensure_base_entry,
        handlers::lottery::purchase_entries,
        handlers::lottery::visit_bonus,
        handlers::lottery::checkin_bonus,
        handlers::lottery::my_entries,
        handlers::lottery::winners,
        handlers::cron::start_weekly,
        handlers::cron::execute_drawing,
        handlers::cron::cancel_drawing,
    ),
    components(
        schemas(
            DrawingStatus,
            PrizeTier,
            PrizeType,
            EntryCategory,
            DrawingResponse,
            EntryBreakdown,
            UserEntriesInfo,
            RemainingAllowance,
            OddsInfo,
            CurrentLotteryResponse,
            EnsureBaseEntryResponse,
            PurchaseEntriesRequest,
            PurchaseEntriesResponse,
            VisitBonusRequest,
            CheckinBonusRequest,
            BonusGrantResponse,
            EntryResponse,
            MyEntriesResponse,
            WinnersQuery,
            WinnerResponse,
            ExecuteDrawingRequest,
            ExecuteDrawingResponse,
            CancelDrawingRequest,
            CreateDrawingResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "lottery", description = "每周抽奖"),
        (name = "internal", description = "调度/运维端点（共享密钥）")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
