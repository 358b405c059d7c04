//! 核心模块 - 配置、运行状态与后台任务

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::LedgerState;
pub use tasks::{BackgroundTasks, TaskKind};
