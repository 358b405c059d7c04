use chrono::NaiveDate;
use route_ledger::ledger::balance;
use route_ledger::{EntityStore, MemoryRemote, RemoteStore, SearchFilter, SnapshotService};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{CustomerDraft, PAYMENT_LABEL, RouteDay, TransactionDraft};
use std::sync::Arc;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn setup(day: RouteDay) -> (Arc<MemoryRemote>, EntityStore) {
    let remote = Arc::new(MemoryRemote::default());
    let store = EntityStore::new(remote.clone(), day);
    (remote, store)
}

#[tokio::test]
async fn pending_is_total_minus_paid_across_bills() {
    let (_remote, mut store) = setup(RouteDay::Mon);
    let shop = store
        .upsert_customer(CustomerDraft::new(1, "Shop A", RouteDay::Mon), None)
        .await
        .unwrap();
    let writer = store.writer();
    writer.record_bill(shop.id, "#1", date(1), 500, 200).await.unwrap();
    writer.record_bill(shop.id, "#2", date(2), 300, 300).await.unwrap();

    store.refresh().await.unwrap();
    let view = store.view(&SearchFilter::default());
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].pending, Decimal::from(300));
    assert_eq!(view.total_pending, Decimal::from(300));
    assert_eq!(
        balance::pending_for(shop.id, store.transactions()),
        Decimal::from(300)
    );
}

#[tokio::test]
async fn direct_payment_without_bills_goes_negative() {
    let (remote, mut store) = setup(RouteDay::Mon);
    let shop = store
        .upsert_customer(CustomerDraft::new(1, "Shop B", RouteDay::Mon), None)
        .await
        .unwrap();
    store
        .writer()
        .receive_payment(shop.id, date(5), 150)
        .await
        .unwrap();

    store.refresh().await.unwrap();
    let txns = store.transactions();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].bill_no, PAYMENT_LABEL);
    assert_eq!(txns[0].total_amount, Decimal::ZERO);
    assert_eq!(txns[0].paid_amount, Decimal::from(150));
    assert_eq!(balance::pending_for(shop.id, txns), Decimal::from(-150));
    assert_eq!(balance::collected_on(date(5), txns), Decimal::from(150));

    let collection = store.daily_collection(date(5)).await.unwrap();
    assert_eq!(collection.total, Decimal::from(150));
    assert_eq!(remote.transaction_count(), 1);
}

#[tokio::test]
async fn non_numeric_paid_amount_coerces_to_zero() {
    let (_remote, store) = setup(RouteDay::Mon);
    let shop = store
        .upsert_customer(CustomerDraft::new(1, "Shop C", RouteDay::Mon), None)
        .await
        .unwrap();

    let draft = TransactionDraft::bill(shop.id, "#7", date(3), "250", "abc");
    let created = store.upsert_transaction(&draft, None).await.unwrap();
    assert_eq!(created.paid_amount, Decimal::ZERO);
    assert_eq!(created.total_amount, Decimal::from(250));

    let negative = TransactionDraft::bill(shop.id, "#8", date(3), "-10", -5);
    let created = store.upsert_transaction(&negative, None).await.unwrap();
    assert_eq!(created.total_amount, Decimal::ZERO);
    assert_eq!(created.paid_amount, Decimal::ZERO);
}

#[tokio::test]
async fn import_without_transactions_key_still_inserts_customers() {
    let (remote, _store) = setup(RouteDay::Mon);
    let service = SnapshotService::new(remote.clone());
    let doc = json!({
        "customers": [
            {"id": 11, "sr_no": 1, "name": "Shop A", "route_day": "Mon"},
            {"id": 12, "sr_no": 2, "name": "Shop B", "route_day": "Fri", "mobile": "555"}
        ],
        "generatedAt": "2025-03-10T10:00:00Z"
    });
    let summary = service.import_snapshot(&doc).await.unwrap();
    assert_eq!(summary.customers_inserted, 2);
    assert_eq!(summary.transactions_inserted, 0);
    assert!(summary.is_clean());
    assert_eq!(remote.customer_count(), 2);

    let empty = service.import_snapshot(&json!({})).await.unwrap();
    assert_eq!(empty.customers_inserted, 0);
    assert!(empty.is_clean());
}

#[tokio::test]
async fn other_days_never_count_toward_aggregate() {
    let (_remote, mut store) = setup(RouteDay::Mon);
    let writer = store.writer();
    let mon = writer
        .upsert_customer(CustomerDraft::new(1, "Mon Shop", RouteDay::Mon), None)
        .await
        .unwrap();
    let tue = writer
        .upsert_customer(CustomerDraft::new(1, "Tue Shop", RouteDay::Tue), None)
        .await
        .unwrap();
    writer.record_bill(mon.id, "#1", date(1), 100, 0).await.unwrap();
    writer.record_bill(tue.id, "#2", date(1), 900, 0).await.unwrap();

    store.refresh().await.unwrap();
    assert!(store.customers().iter().all(|c| c.route_day == RouteDay::Mon));
    assert_eq!(
        balance::aggregate_pending(store.customers(), store.transactions()),
        Decimal::from(100)
    );
    assert_eq!(store.view(&SearchFilter::default()).total_pending, Decimal::from(100));
}

#[tokio::test]
async fn load_route_is_idempotent_and_serial_ordered() {
    let (_remote, mut store) = setup(RouteDay::Wed);
    for (serial, name) in [(3, "C"), (1, "A"), (2, "B"), (1, "A2")] {
        store
            .upsert_customer(CustomerDraft::new(serial, name, RouteDay::Wed), None)
            .await
            .unwrap();
    }

    let first = store.load_route(RouteDay::Wed).await.unwrap().to_vec();
    let second = store.load_route(RouteDay::Wed).await.unwrap().to_vec();
    assert_eq!(first, second);
    let names: Vec<_> = first.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["A", "A2", "B", "C"]);
}

#[tokio::test]
async fn import_of_export_adds_exactly_the_exported_counts() {
    let (remote, store) = setup(RouteDay::Mon);
    let writer = store.writer();
    let a = writer
        .upsert_customer(CustomerDraft::new(1, "Shop A", RouteDay::Mon), None)
        .await
        .unwrap();
    let b = writer
        .upsert_customer(CustomerDraft::new(2, "Shop B", RouteDay::Thu), None)
        .await
        .unwrap();
    writer.record_bill(a.id, "#1", date(1), 500, 200).await.unwrap();
    writer.receive_payment(b.id, date(2), 75).await.unwrap();

    let service = SnapshotService::new(remote.clone());
    let snapshot = service.export_snapshot().await.unwrap();
    let before_customers = remote.all_customers().await.unwrap();
    let before_transactions = remote.all_transactions().await.unwrap();

    let bytes = serde_json::to_vec(&snapshot).unwrap();
    let summary = service.import_bytes(&bytes).await.unwrap();
    assert!(summary.is_clean(), "{:?}", summary.errors);
    assert_eq!(summary.customers_inserted, snapshot.customers.len());
    assert_eq!(summary.transactions_inserted, snapshot.transactions.len());
    assert_eq!(remote.customer_count(), 2 * before_customers.len());
    assert_eq!(remote.transaction_count(), 2 * before_transactions.len());

    // pre-existing records untouched
    for original in &before_customers {
        let now = remote.customer_by_id(original.id).await.unwrap();
        assert_eq!(now.as_ref(), Some(original));
    }
    let after = remote.all_transactions().await.unwrap();
    for original in &before_transactions {
        assert!(after.contains(original));
    }

    // copies carry the same balances, owned by the copies
    let rows = service.full_report().await.unwrap();
    let shop_a: Vec<_> = rows.iter().filter(|r| r.name == "Shop A").collect();
    assert_eq!(shop_a.len(), 2);
    assert!(shop_a.iter().all(|r| r.pending == Decimal::from(300)));
}

#[tokio::test]
async fn search_narrows_rows_but_not_route_total() {
    let (_remote, mut store) = setup(RouteDay::Sat);
    let writer = store.writer();
    let gupta = writer
        .upsert_customer(
            CustomerDraft::new(1, "Gupta Traders", RouteDay::Sat).with_mobile("9000011111"),
            None,
        )
        .await
        .unwrap();
    let mehta = writer
        .upsert_customer(CustomerDraft::new(2, "Mehta & Sons", RouteDay::Sat), None)
        .await
        .unwrap();
    writer.record_bill(gupta.id, "#1", date(8), 120, 20).await.unwrap();
    writer.record_bill(mehta.id, "#2", date(8), 60, 0).await.unwrap();
    store.refresh().await.unwrap();

    let by_mobile = store.view(&SearchFilter::new("00011"));
    assert_eq!(by_mobile.count(), 1);
    assert_eq!(by_mobile.rows[0].customer.id, gupta.id);
    assert_eq!(by_mobile.visible_pending, Decimal::from(100));
    assert_eq!(by_mobile.total_pending, Decimal::from(160));

    let by_name = store.view(&SearchFilter::new("MEHTA"));
    assert_eq!(by_name.count(), 1);
    assert_eq!(by_name.visible_pending, Decimal::from(60));
}

#[tokio::test]
async fn editing_customer_and_bill_in_place() {
    let (remote, mut store) = setup(RouteDay::Mon);
    let shop = store
        .upsert_customer(CustomerDraft::new(3, "Shop E", RouteDay::Mon), None)
        .await
        .unwrap();
    let bill = store
        .writer()
        .record_bill(shop.id, "#9", date(4), 400, 100)
        .await
        .unwrap();

    // edit-customer: 只改路线日，其余字段沿用
    let current = store.statement(shop.id).await.unwrap().customer;
    let mut draft = CustomerDraft::from(&current);
    draft.route_day = RouteDay::Tue;
    let moved = store.upsert_customer(draft, Some(shop.id)).await.unwrap();
    assert_eq!(moved.id, shop.id);
    assert_eq!(moved.serial_no, 3);
    assert_eq!(moved.name, "Shop E");

    // edit-bill: 新总额，付款沿用原值
    let edited = TransactionDraft::bill(shop.id, "#9", bill.date, 600, bill.paid_amount);
    let updated = store.upsert_transaction(&edited, Some(bill.id)).await.unwrap();
    assert_eq!(updated.id, bill.id);
    assert_eq!(updated.paid_amount, Decimal::from(100));

    store.refresh().await.unwrap();
    assert!(store.customers().is_empty());
    store.load_route(RouteDay::Tue).await.unwrap();
    store.refresh().await.unwrap();
    let view = store.view(&SearchFilter::default());
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].pending, Decimal::from(500));
    assert_eq!(remote.customer_count(), 1);
    assert_eq!(remote.transaction_count(), 1);
}
