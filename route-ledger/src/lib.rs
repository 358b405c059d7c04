//! Route Ledger - 线路客户账本
//!
//! Customers grouped into weekly delivery routes, the bills and payments
//! issued to them, and the balances derived from those transactions.
//!
//! # 模块结构
//!
//! ```text
//! route-ledger/src/
//! ├── core/          # 配置、运行状态、后台任务
//! ├── db/            # SQLite 连接池与仓储
//! ├── remote/        # 远程数据接口 (SQLite / 内存) 与变更通知
//! ├── ledger/        # 实体存储、余额计算、协调器、备份恢复、路线选择
//! ├── local_state.rs # 本地持久状态 (路线日、会话标记)
//! └── utils/         # 日志
//! ```

pub mod core;
pub mod db;
pub mod ledger;
pub mod local_state;
pub mod remote;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, LedgerState, TaskKind};
pub use ledger::{
    ChangeReconciler, EntityStore, LedgerError, LedgerResult, LedgerSnapshot, LedgerWriter,
    ReconcileState, ReconcilerHandle, RouteSelector, SearchFilter, SnapshotService,
};
pub use local_state::{FileLocalState, LocalState, MemoryLocalState};
pub use remote::{MemoryRemote, RemoteError, RemoteStore, SqliteRemote};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置环境 (dotenv, 工作目录, 日志)
pub fn setup_environment() -> Result<Config, AppError> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(config)
}
