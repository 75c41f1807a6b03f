use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use nicework_lottery::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{NotificationApi, PointsApi, VisitsApi},
    handlers,
    middlewares::{IdentityMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建外部服务客户端
    let points_api = PointsApi::new(config.points.clone());
    let notification_api = NotificationApi::new(config.notifications.clone());
    let visits_api = VisitsApi::new(config.visits.clone());

    // 创建服务
    let drawing_service = DrawingService::new(pool.clone());
    let entry_service = EntryService::new(
        pool.clone(),
        drawing_service.clone(),
        points_api.clone(),
        visits_api.clone(),
        config.lottery.clone(),
    );
    let draw_service = DrawService::new(
        pool.clone(),
        drawing_service.clone(),
        points_api.clone(),
        notification_api.clone(),
        config.lottery.clone(),
    );

    // 启动后台任务（建期 + 到期开奖）
    tasks::spawn_all(drawing_service.clone(), draw_service.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let app_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(IdentityMiddleware::new())
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(drawing_service.clone()))
            .app_data(web::Data::new(entry_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::lottery_config))
            .service(web::scope("/internal").configure(handlers::cron_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
