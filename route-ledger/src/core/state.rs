//! 账本运行状态
//!
//! Wires configuration, the SQLite store and local persisted state into the
//! engine's parts.

use super::Config;
use crate::db::DbService;
use crate::ledger::{ChangeReconciler, EntityStore, ReconcilerHandle, RouteSelector, SnapshotService};
use crate::local_state::{FileLocalState, LocalState};
use crate::remote::{RemoteStore, SqliteRemote};
use shared::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct LedgerState {
    pub config: Config,
    pub remote: Arc<SqliteRemote>,
    pub local: Arc<FileLocalState>,
}

impl LedgerState {
    /// 初始化
    ///
    /// 1. 确保工作目录存在
    /// 2. 打开数据库并执行迁移
    /// 3. 加载本地状态文件
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(PathBuf::from(&config.work_dir))?;

        let db = DbService::new(&config.database_path)
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;
        let remote = Arc::new(SqliteRemote::new(db, config.feed_capacity));

        let local = FileLocalState::open(config.state_file())
            .map_err(|e| AppError::with_message(shared::ErrorCode::LocalStateError, e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            remote,
            local: Arc::new(local),
        })
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.remote.clone()
    }

    pub fn local_state(&self) -> Arc<dyn LocalState> {
        self.local.clone()
    }

    pub fn route_selector(&self) -> RouteSelector {
        RouteSelector::load(self.local_state())
    }

    /// Store scoped to the persisted route day (not yet loaded)
    pub fn entity_store(&self) -> EntityStore {
        EntityStore::new(self.remote(), self.local.route_day())
    }

    pub fn snapshots(&self) -> SnapshotService {
        SnapshotService::new(self.remote())
    }

    pub fn reconciler(&self) -> (ChangeReconciler, ReconcilerHandle) {
        ChangeReconciler::new(self.remote(), self.route_selector(), self.config.trigger_buffer)
    }
}
