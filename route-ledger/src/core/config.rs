use std::path::PathBuf;

/// 账本配置 - 所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、本地状态、日志) |
/// | DATABASE_PATH | <WORK_DIR>/ledger.db | SQLite 数据库文件 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (unset) | 日志目录，设置后按天滚动写文件 |
/// | ENVIRONMENT | development | 运行环境 |
/// | FEED_CAPACITY | 256 | 变更通知广播缓冲 |
/// | TRIGGER_BUFFER | 64 | 协调器指令队列长度 |
/// | SESSION_TTL_HOURS | 24 | 会话有效期(小时) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/srv/ledger LOG_LEVEL=debug cargo run -- watch
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
    /// 变更通知广播缓冲
    pub feed_capacity: usize,
    /// 协调器指令队列长度
    pub trigger_buffer: usize,
    /// 会话有效期 (小时)
    pub session_ttl_hours: i64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("ledger.db")
                .to_string_lossy()
                .into_owned()
        });

        Self {
            database_path,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            feed_capacity: std::env::var("FEED_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(256),
            trigger_buffer: std::env::var("TRIGGER_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(64),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(24),
            work_dir,
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = PathBuf::from(&config.work_dir)
            .join("ledger.db")
            .to_string_lossy()
            .into_owned();
        config
    }

    /// 本地状态文件 (路线日、会话标记)
    pub fn state_file(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("state.json")
    }

    pub fn session_ttl_millis(&self) -> i64 {
        self.session_ttl_hours.saturating_mul(60 * 60 * 1000)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
