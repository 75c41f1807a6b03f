use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cron: CronConfig,
    pub points: PointsConfig,
    pub notifications: NotificationConfig,
    pub visits: VisitsConfig,
    #[serde(default)]
    pub lottery: LotteryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 调度端点共享密钥（/internal 下的 start-weekly / execute-drawing 等）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    pub secret: String,
}

/// Nice 积分账本服务（外部协作方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    pub base_url: String,
    pub api_key: String,
}

/// 推送/站内信服务（外部协作方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub base_url: String,
    pub api_key: String,
}

/// 到店/消费记录服务（外部协作方，防刷校验数据源）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitsConfig {
    pub base_url: String,
    pub api_key: String,
}

/// 抽奖规则参数。默认值即线上规则，配置文件可按期调整。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// 每期每用户购买券上限
    #[serde(default = "default_purchase_cap")]
    pub purchase_cap: i64,
    /// 单次购买请求的数量上限（1..=该值）
    #[serde(default = "default_max_purchase_per_request")]
    pub max_purchase_per_request: i64,
    /// 每期到店奖励券上限
    #[serde(default = "default_visit_cap")]
    pub visit_cap: i64,
    /// 打卡奖励一次发放的券数（每期限一次）
    #[serde(default = "default_checkin_quantity")]
    pub checkin_quantity: i64,
    /// 购买一张券消耗的 Nice 积分
    #[serde(default = "default_entry_cost_nice")]
    pub entry_cost_nice: i64,
    /// 中奖兑换码有效天数
    #[serde(default = "default_voucher_validity_days")]
    pub voucher_validity_days: i64,
}

fn default_purchase_cap() -> i64 {
    10
}
fn default_max_purchase_per_request() -> i64 {
    10
}
fn default_visit_cap() -> i64 {
    3
}
fn default_checkin_quantity() -> i64 {
    2
}
fn default_entry_cost_nice() -> i64 {
    200
}
fn default_voucher_validity_days() -> i64 {
    30
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            purchase_cap: default_purchase_cap(),
            max_purchase_per_request: default_max_purchase_per_request(),
            visit_cap: default_visit_cap(),
            checkin_quantity: default_checkin_quantity(),
            entry_cost_nice: default_entry_cost_nice(),
            voucher_validity_days: default_voucher_validity_days(),
        }
    }
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str)
                    .map_err(|e| anyhow::anyhow!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 与调度密钥在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")
                })?;
                let cron_secret = get_env("CRON_SECRET").ok_or_else(|| {
                    anyhow::anyhow!("缺少 CRON_SECRET 环境变量，且未找到配置文件 config.toml")
                })?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    cron: CronConfig {
                        secret: cron_secret,
                    },
                    points: PointsConfig {
                        base_url: get_env("POINTS_BASE_URL").unwrap_or_default(),
                        api_key: get_env("POINTS_API_KEY").unwrap_or_default(),
                    },
                    notifications: NotificationConfig {
                        base_url: get_env("NOTIFICATIONS_BASE_URL").unwrap_or_default(),
                        api_key: get_env("NOTIFICATIONS_API_KEY").unwrap_or_default(),
                    },
                    visits: VisitsConfig {
                        base_url: get_env("VISITS_BASE_URL").unwrap_or_default(),
                        api_key: get_env("VISITS_API_KEY").unwrap_or_default(),
                    },
                    lottery: LotteryConfig::default(),
                }
            }
            Err(e) => {
                return Err(anyhow::anyhow!("无法读取配置文件 {config_path}: {e}"));
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("CRON_SECRET") {
            config.cron.secret = v;
        }
        if let Ok(v) = env::var("POINTS_BASE_URL") {
            config.points.base_url = v;
        }
        if let Ok(v) = env::var("POINTS_API_KEY") {
            config.points.api_key = v;
        }
        if let Ok(v) = env::var("NOTIFICATIONS_BASE_URL") {
            config.notifications.base_url = v;
        }
        if let Ok(v) = env::var("NOTIFICATIONS_API_KEY") {
            config.notifications.api_key = v;
        }
        if let Ok(v) = env::var("VISITS_BASE_URL") {
            config.visits.base_url = v;
        }
        if let Ok(v) = env::var("VISITS_API_KEY") {
            config.visits.api_key = v;
        }

        Ok(config)
    }
}
