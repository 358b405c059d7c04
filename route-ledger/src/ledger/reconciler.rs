//! Change Reconciler
//!
//! Owns the [`EntityStore`] and keeps it in step with the remote store.
//!
//! # 状态机
//!
//! ```text
//! Idle ──trigger──▶ Fetching ──ok──▶ Idle
//!                      │
//!                      └──err──▶ Error ──trigger──▶ Fetching
//! ```
//!
//! Triggers: route day change, change-feed notification, manual refresh.
//!
//! - Each route day is a scope with its own epoch. Disposing a scope drops
//!   its change subscription and bumps the epoch; fetches already running
//!   are not aborted, their results are discarded on arrival.
//! - Feed notifications that arrive while a fetch is running are coalesced
//!   into one follow-up fetch.
//! - A manual refresh always starts a fetch. Within a scope, results apply
//!   in completion order.

use super::error::{LedgerError, LedgerResult};
use super::route::RouteSelector;
use super::store::{EntityStore, ScopeData, fetch_scope};
use super::view::{RouteView, SearchFilter};
use crate::remote::{ChangeSubscription, FeedSignal, RemoteStore};
use serde::Serialize;
use shared::models::RouteDay;
use shared::{AppError, ChangeFilter};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileState {
    Idle,
    Fetching,
    Error,
}

/// What the reconciler publishes after every transition
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub day: RouteDay,
    pub state: ReconcileState,
    pub epoch: u64,
    /// Last successfully applied data for `day`
    pub data: ScopeData,
    /// Whether the current scope has received at least one result
    pub loaded: bool,
    /// Error of the most recent failed fetch, cleared by the next success
    pub last_error: Option<AppError>,
    /// Results applied since start
    pub applied: u64,
}

impl LedgerSnapshot {
    pub fn view(&self, filter: &SearchFilter) -> RouteView {
        RouteView::build(
            self.day,
            &self.data.customers,
            &self.data.transactions,
            filter,
        )
    }

    /// Idle with data for the current scope
    pub fn is_settled(&self) -> bool {
        self.state == ReconcileState::Idle && self.loaded
    }
}

enum Command {
    SetDay {
        day: RouteDay,
        reply: oneshot::Sender<LedgerResult<()>>,
    },
    Refresh,
}

struct FetchOutcome {
    epoch: u64,
    result: LedgerResult<ScopeData>,
}

enum Event {
    Command(Command),
    Fetched(FetchOutcome),
    Feed(Option<FeedSignal>),
}

/// Cloneable handle for driving a running [`ChangeReconciler`]
#[derive(Clone)]
pub struct ReconcilerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<LedgerSnapshot>>,
}

impl ReconcilerHandle {
    /// Switch the active route day: persist it, dispose the old scope, load the new one
    pub async fn set_day(&self, day: RouteDay) -> LedgerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::SetDay { day, reply })
            .await
            .map_err(|_| LedgerError::Stopped)?;
        rx.await.map_err(|_| LedgerError::Stopped)?
    }

    /// Start a fetch of the active scope now
    pub async fn refresh(&self) -> LedgerResult<()> {
        self.commands
            .send(Command::Refresh)
            .await
            .map_err(|_| LedgerError::Stopped)
    }

    pub fn snapshot(&self) -> Arc<LedgerSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LedgerSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `pred`
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(&LedgerSnapshot) -> bool,
    ) -> LedgerResult<Arc<LedgerSnapshot>> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| pred(s.as_ref()))
            .await
            .map_err(|_| LedgerError::Stopped)?;
        Ok(Arc::clone(&snapshot))
    }
}

pub struct ChangeReconciler {
    remote: Arc<dyn RemoteStore>,
    selector: RouteSelector,
    store: EntityStore,
    subscription: Option<ChangeSubscription>,
    epoch: u64,
    in_flight: usize,
    dirty: bool,
    state: ReconcileState,
    loaded: bool,
    last_error: Option<AppError>,
    applied: u64,
    commands: mpsc::Receiver<Command>,
    results_tx: mpsc::UnboundedSender<FetchOutcome>,
    results_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    snapshots: watch::Sender<Arc<LedgerSnapshot>>,
}

impl ChangeReconciler {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        selector: RouteSelector,
        trigger_buffer: usize,
    ) -> (Self, ReconcilerHandle) {
        let day = selector.get();
        let store = EntityStore::new(remote.clone(), day);
        let (commands_tx, commands) = mpsc::channel(trigger_buffer.max(1));
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(Arc::new(LedgerSnapshot {
            day,
            state: ReconcileState::Idle,
            epoch: 0,
            data: store.scope().clone(),
            loaded: false,
            last_error: None,
            applied: 0,
        }));

        let reconciler = Self {
            remote,
            selector,
            store,
            subscription: None,
            epoch: 0,
            in_flight: 0,
            dirty: false,
            state: ReconcileState::Idle,
            loaded: false,
            last_error: None,
            applied: 0,
            commands,
            results_tx,
            results_rx,
            snapshots,
        };
        let handle = ReconcilerHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (reconciler, handle)
    }

    /// Run until `shutdown` fires or every handle is dropped
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(day = %self.store.day(), "ChangeReconciler started");
        self.open_scope();

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("ChangeReconciler shutting down");
                    break;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Event::Command(cmd),
                    None => break,
                },
                Some(outcome) = self.results_rx.recv() => Event::Fetched(outcome),
                signal = next_signal(&mut self.subscription) => Event::Feed(signal),
            };

            match event {
                Event::Command(Command::SetDay { day, reply }) => {
                    let _ = reply.send(self.switch_day(day));
                }
                Event::Command(Command::Refresh) => {
                    tracing::debug!(day = %self.store.day(), "Manual refresh");
                    self.start_fetch();
                }
                Event::Fetched(outcome) => self.on_fetched(outcome),
                Event::Feed(signal) => self.on_feed(signal),
            }
        }

        self.subscription = None;
        tracing::info!("ChangeReconciler stopped");
    }

    fn open_scope(&mut self) {
        self.subscription = Some(self.remote.subscribe(ChangeFilter::any()));
        self.start_fetch();
    }

    fn close_scope(&mut self) {
        // drop 即退订
        self.subscription = None;
        self.epoch += 1;
        self.in_flight = 0;
        self.dirty = false;
        self.loaded = false;
        self.last_error = None;
    }

    fn switch_day(&mut self, day: RouteDay) -> LedgerResult<()> {
        self.selector.set(day)?;
        if day == self.store.day() {
            self.start_fetch();
            return Ok(());
        }

        self.close_scope();
        self.store.apply(ScopeData {
            day,
            ..ScopeData::default()
        });
        tracing::info!(day = %day, epoch = self.epoch, "Scope opened");
        self.open_scope();
        Ok(())
    }

    fn start_fetch(&mut self) {
        self.in_flight += 1;
        self.state = ReconcileState::Fetching;

        let remote = self.remote.clone();
        let results = self.results_tx.clone();
        let epoch = self.epoch;
        let day = self.store.day();
        tracing::debug!(day = %day, epoch, in_flight = self.in_flight, "Fetch started");

        // 不取消进行中的请求，作用域销毁后结果按 epoch 丢弃
        tokio::spawn(async move {
            let result = fetch_scope(remote.as_ref(), day).await;
            let _ = results.send(FetchOutcome { epoch, result });
        });

        self.publish();
    }

    fn on_fetched(&mut self, outcome: FetchOutcome) {
        if outcome.epoch != self.epoch {
            tracing::debug!(
                epoch = outcome.epoch,
                current = self.epoch,
                "Discarding result from disposed scope"
            );
            return;
        }
        self.in_flight = self.in_flight.saturating_sub(1);

        let failed = match outcome.result {
            Ok(data) => {
                self.store.apply(data);
                self.loaded = true;
                self.applied += 1;
                self.last_error = None;
                false
            }
            Err(e) => {
                tracing::warn!(day = %self.store.day(), error = %e, "Fetch failed, keeping previous data");
                self.last_error = Some(e.into());
                true
            }
        };

        if self.in_flight > 0 {
            self.state = ReconcileState::Fetching;
        } else if self.dirty {
            self.dirty = false;
            self.start_fetch();
            return;
        } else if failed {
            self.state = ReconcileState::Error;
        } else {
            self.state = ReconcileState::Idle;
        }
        self.publish();
    }

    fn on_feed(&mut self, signal: Option<FeedSignal>) {
        match signal {
            None => {
                tracing::warn!("Change feed closed, live updates stopped");
                self.subscription = None;
                return;
            }
            Some(FeedSignal::Changed(event)) => {
                tracing::debug!(table = %event.table, kind = %event.kind, id = event.id, "Change received");
            }
            Some(FeedSignal::Lagged(n)) => {
                tracing::debug!(missed = n, "Change feed lagged, reloading scope");
            }
        }

        if self.in_flight > 0 {
            self.dirty = true;
        } else {
            self.start_fetch();
        }
    }

    fn publish(&self) {
        let snapshot = LedgerSnapshot {
            day: self.store.day(),
            state: self.state,
            epoch: self.epoch,
            data: self.store.scope().clone(),
            loaded: self.loaded,
            last_error: self.last_error.clone(),
            applied: self.applied,
        };
        self.snapshots.send_replace(Arc::new(snapshot));
    }
}

async fn next_signal(subscription: &mut Option<ChangeSubscription>) -> Option<FeedSignal> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_state::MemoryLocalState;
    use crate::remote::MemoryRemote;
    use shared::ErrorCode;
    use shared::models::CustomerDraft;

    fn spawn(remote: Arc<MemoryRemote>) -> (ReconcilerHandle, CancellationToken) {
        let selector = RouteSelector::load(Arc::new(MemoryLocalState::new()));
        let (reconciler, handle) = ChangeReconciler::new(remote, selector, 8);
        let token = CancellationToken::new();
        tokio::spawn(reconciler.run(token.clone()));
        (handle, token)
    }

    #[tokio::test]
    async fn test_initial_load_settles_idle() {
        let remote = Arc::new(MemoryRemote::default());
        remote
            .insert_customer(&CustomerDraft::new(1, "Shop A", RouteDay::Mon))
            .await
            .unwrap();

        let (handle, token) = spawn(remote.clone());
        let snapshot = handle.wait_for(LedgerSnapshot::is_settled).await.unwrap();
        assert_eq!(snapshot.data.customers.len(), 1);
        assert!(snapshot.last_error.is_none());
        token.cancel();
    }

    #[tokio::test]
    async fn test_failure_moves_to_error_then_recovers() {
        let remote = Arc::new(MemoryRemote::default());
        remote.set_offline(true);
        let (handle, token) = spawn(remote.clone());

        let failed = handle
            .wait_for(|s| s.state == ReconcileState::Error)
            .await
            .unwrap();
        assert_eq!(
            failed.last_error.as_ref().map(|e| e.code),
            Some(ErrorCode::RemoteUnavailable)
        );
        assert!(!failed.loaded);

        remote.set_offline(false);
        handle.refresh().await.unwrap();
        let recovered = handle.wait_for(LedgerSnapshot::is_settled).await.unwrap();
        assert!(recovered.last_error.is_none());
        token.cancel();
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_reconciler() {
        let remote = Arc::new(MemoryRemote::default());
        let (handle, token) = spawn(remote);
        handle.wait_for(LedgerSnapshot::is_settled).await.unwrap();
        token.cancel();
        // 等待任务退出
        while !handle.commands.is_closed() {
            tokio::task::yield_now().await;
        }
        assert!(matches!(handle.refresh().await, Err(LedgerError::Stopped)));
    }
}
