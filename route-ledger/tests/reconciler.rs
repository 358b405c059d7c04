use route_ledger::{
    ChangeReconciler, LedgerSnapshot, LedgerWriter, LocalState, MemoryLocalState, MemoryRemote,
    ReconcileState, ReconcilerHandle, RouteSelector, SearchFilter,
};
use rust_decimal::Decimal;
use shared::ErrorCode;
use shared::models::{CustomerDraft, RouteDay};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    remote: Arc<MemoryRemote>,
    local: Arc<MemoryLocalState>,
    handle: ReconcilerHandle,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Harness {
    fn start(remote: Arc<MemoryRemote>, day: RouteDay) -> Self {
        let local = Arc::new(MemoryLocalState::new());
        local.set_route_day(day).unwrap();
        let selector = RouteSelector::load(local.clone());
        let (reconciler, handle) = ChangeReconciler::new(remote.clone(), selector, 16);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(reconciler.run(shutdown.clone()));
        Self {
            remote,
            local,
            handle,
            shutdown,
            task,
        }
    }

    fn writer(&self) -> LedgerWriter {
        LedgerWriter::new(self.remote.clone())
    }

    async fn until<F>(&self, pred: F) -> Arc<LedgerSnapshot>
    where
        F: FnMut(&LedgerSnapshot) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(10), self.handle.wait_for(pred))
            .await
            .expect("snapshot never matched")
            .unwrap()
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

fn names(snapshot: &LedgerSnapshot) -> Vec<&str> {
    snapshot.data.customers.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn route_change_mid_fetch_settles_on_new_day() {
    let remote = Arc::new(MemoryRemote::default());
    let h = Harness::start(remote.clone(), RouteDay::Mon);
    let writer = h.writer();
    writer
        .upsert_customer(CustomerDraft::new(1, "Mon Shop", RouteDay::Mon), None)
        .await
        .unwrap();
    writer
        .upsert_customer(CustomerDraft::new(1, "Tue Shop", RouteDay::Tue), None)
        .await
        .unwrap();
    let settled = h
        .until(|s| s.is_settled() && s.data.customers.len() == 1)
        .await;
    assert_eq!(names(&settled), ["Mon Shop"]);

    // Mon 慢, Tue 快
    remote.set_day_latency(RouteDay::Mon, Duration::from_millis(500));
    remote.set_day_latency(RouteDay::Tue, Duration::from_millis(50));
    h.handle.refresh().await.unwrap();
    h.until(|s| s.state == ReconcileState::Fetching).await;

    h.handle.set_day(RouteDay::Tue).await.unwrap();
    let settled = h.until(|s| s.is_settled()).await;
    assert_eq!(settled.day, RouteDay::Tue);
    assert_eq!(names(&settled), ["Tue Shop"]);

    // the stale Monday result lands and must be dropped
    tokio::time::sleep(Duration::from_secs(1)).await;
    let last = h.handle.snapshot();
    assert_eq!(last.day, RouteDay::Tue);
    assert_eq!(names(&last), ["Tue Shop"]);
    assert_eq!(last.state, ReconcileState::Idle);
    assert!(last.last_error.is_none());
    assert_eq!(h.local.route_day(), RouteDay::Tue);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn writes_during_fetch_coalesce_into_one_refetch() {
    let remote = Arc::new(MemoryRemote::default());
    remote.set_day_latency(RouteDay::Mon, Duration::from_millis(100));
    let h = Harness::start(remote.clone(), RouteDay::Mon);
    h.until(|s| s.state == ReconcileState::Fetching).await;

    let writer = h.writer();
    for serial in 1..=5 {
        writer
            .upsert_customer(
                CustomerDraft::new(serial, format!("Shop {serial}"), RouteDay::Mon),
                None,
            )
            .await
            .unwrap();
    }

    let settled = h
        .until(|s| s.is_settled() && s.data.customers.len() == 5)
        .await;
    assert_eq!(settled.day, RouteDay::Mon);
    assert_eq!(remote.customer_fetches(), 2);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_fetches_even_while_busy() {
    let remote = Arc::new(MemoryRemote::default());
    remote.set_day_latency(RouteDay::Mon, Duration::from_millis(100));
    let h = Harness::start(remote.clone(), RouteDay::Mon);
    h.until(|s| s.state == ReconcileState::Fetching).await;

    h.handle.refresh().await.unwrap();
    h.until(|s| s.is_settled()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(remote.customer_fetches(), 2);
    assert_eq!(h.handle.snapshot().state, ReconcileState::Idle);

    h.stop().await;
}

#[tokio::test]
async fn remote_failure_keeps_last_data_and_recovers_on_next_change() {
    let remote = Arc::new(MemoryRemote::default());
    let h = Harness::start(remote.clone(), RouteDay::Fri);
    let writer = h.writer();
    let shop = writer
        .upsert_customer(CustomerDraft::new(1, "Fri Shop", RouteDay::Fri), None)
        .await
        .unwrap();
    writer
        .record_bill(shop.id, "#1", shared::util::today(), 250, 50)
        .await
        .unwrap();
    let settled = h
        .until(|s| s.is_settled() && s.data.transactions.len() == 1)
        .await;
    assert_eq!(
        settled.view(&SearchFilter::default()).total_pending,
        Decimal::from(200)
    );

    remote.set_offline(true);
    h.handle.refresh().await.unwrap();
    let failed = h.until(|s| s.state == ReconcileState::Error).await;
    assert_eq!(names(&failed), ["Fri Shop"]);
    let err = failed.last_error.as_ref().unwrap();
    assert_eq!(err.code, ErrorCode::RemoteUnavailable);

    remote.set_offline(false);
    writer
        .upsert_customer(CustomerDraft::new(2, "Fri Annex", RouteDay::Fri), None)
        .await
        .unwrap();
    let recovered = h
        .until(|s| s.is_settled() && s.data.customers.len() == 2)
        .await;
    assert!(recovered.last_error.is_none());
    assert_eq!(names(&recovered), ["Fri Shop", "Fri Annex"]);

    h.stop().await;
}

#[tokio::test]
async fn one_subscription_per_scope_released_on_shutdown() {
    let remote = Arc::new(MemoryRemote::default());
    let h = Harness::start(remote.clone(), RouteDay::Mon);
    h.until(|s| s.is_settled()).await;
    assert_eq!(remote.feed().subscriber_count(), 1);

    for day in [RouteDay::Tue, RouteDay::Wed, RouteDay::Tue] {
        h.handle.set_day(day).await.unwrap();
        h.until(|s| s.is_settled() && s.day == day).await;
        assert_eq!(remote.feed().subscriber_count(), 1);
    }

    let handle = h.handle.clone();
    h.stop().await;
    assert_eq!(remote.feed().subscriber_count(), 0);
    assert!(handle.refresh().await.is_err());
}

#[tokio::test]
async fn other_day_changes_do_not_leak_into_scope() {
    let remote = Arc::new(MemoryRemote::default());
    let h = Harness::start(remote.clone(), RouteDay::Sun);
    let writer = h.writer();
    writer
        .upsert_customer(CustomerDraft::new(1, "Sun Shop", RouteDay::Sun), None)
        .await
        .unwrap();
    h.until(|s| s.is_settled() && s.data.customers.len() == 1).await;

    let before = h.handle.snapshot().applied;
    writer
        .upsert_customer(CustomerDraft::new(1, "Mon Shop", RouteDay::Mon), None)
        .await
        .unwrap();
    let after = h.until(|s| s.is_settled() && s.applied > before).await;
    assert_eq!(names(&after), ["Sun Shop"]);

    h.stop().await;
}
