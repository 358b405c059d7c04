use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use route_ledger::ledger::{self, SearchFilter};
use route_ledger::{BackgroundTasks, LedgerState, LocalState, TaskKind, setup_environment};
use shared::models::{AmountInput, CustomerDraft, RouteDay, TransactionDraft};
use shared::util::{now_millis, today};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "route-ledger")]
#[command(about = "Route-day customer ledger: balances, live reconciliation, backup and restore")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the persisted route day's view in sync with the store until Ctrl-C
    Watch {
        /// Only log customers whose name or mobile matches
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Print the persisted route day's customers and balances
    View {
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show or change the active route day
    Day {
        /// Mon..Sun (full weekday names accepted)
        day: Option<RouteDay>,
    },

    /// Add a customer
    AddCustomer {
        name: String,
        #[arg(long, default_value_t = 0)]
        serial: i64,
        #[arg(long)]
        mobile: Option<String>,
        /// Defaults to the active route day
        #[arg(long)]
        day: Option<RouteDay>,
    },

    /// Change a customer; omitted fields keep their current value
    EditCustomer {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        serial: Option<i64>,
        #[arg(long)]
        mobile: Option<String>,
        #[arg(long)]
        day: Option<RouteDay>,
    },

    /// Record a bill
    Bill {
        customer_id: i64,
        bill_no: String,
        total: String,
        #[arg(long, default_value = "0")]
        paid: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Replace a bill's fields (paid / date default to the stored values)
    EditBill {
        id: i64,
        customer_id: i64,
        bill_no: String,
        total: String,
        #[arg(long)]
        paid: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record a direct payment
    Pay {
        customer_id: i64,
        amount: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// One customer's history, newest first
    Statement { customer_id: i64 },

    /// Money received on a day (default today), across all routes
    Collection { date: Option<NaiveDate> },

    /// Write a full JSON snapshot (default backup_<date>.json)
    Backup { file: Option<PathBuf> },

    /// Import a JSON snapshot; always adds new records
    Restore { file: PathBuf },

    /// Write the balance report as CSV (default Route_Report_<date>.csv)
    Report { file: Option<PathBuf> },

    /// Local session marker
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    Start,
    Status,
    End,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. 设置环境 (dotenv, 工作目录, 日志)
    let config = setup_environment()?;

    // 2. 初始化状态
    let state = LedgerState::initialize(&config).await?;

    match cli.command {
        Commands::Watch { search } => watch(&state, SearchFilter::new(search.unwrap_or_default())).await?,
        Commands::View { search } => {
            let mut store = state.entity_store();
            store.refresh().await?;
            print_view(&store.view(&SearchFilter::new(search.unwrap_or_default())));
        }
        Commands::Day { day } => {
            let mut selector = state.route_selector();
            if let Some(day) = day {
                selector.set(day)?;
            }
            println!("{} ({})", selector.get(), selector.get().label());
        }
        Commands::AddCustomer {
            name,
            serial,
            mobile,
            day,
        } => {
            let day = day.unwrap_or_else(|| state.local.route_day());
            let mut draft = CustomerDraft::new(serial, name, day);
            draft.mobile = mobile;
            let customer = state.entity_store().upsert_customer(draft, None).await?;
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        Commands::EditCustomer {
            id,
            name,
            serial,
            mobile,
            day,
        } => {
            let store = state.entity_store();
            let current = store.statement(id).await?.customer;
            let mut draft = CustomerDraft::from(&current);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(serial) = serial {
                draft.serial_no = serial;
            }
            if let Some(mobile) = mobile {
                draft.mobile = Some(mobile);
            }
            if let Some(day) = day {
                draft.route_day = day;
            }
            let customer = store.upsert_customer(draft, Some(id)).await?;
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        Commands::Bill {
            customer_id,
            bill_no,
            total,
            paid,
            date,
        } => {
            let bill = state
                .entity_store()
                .writer()
                .record_bill(
                    customer_id,
                    &bill_no,
                    date.unwrap_or_else(today),
                    AmountInput::from(total),
                    AmountInput::from(paid),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&bill)?);
        }
        Commands::EditBill {
            id,
            customer_id,
            bill_no,
            total,
            paid,
            date,
        } => {
            let store = state.entity_store();
            // 未指定的字段沿用原账单 (按所属客户查找)
            let stored = store
                .statement(customer_id)
                .await?
                .lines
                .into_iter()
                .map(|line| line.transaction)
                .find(|t| t.id == id);
            let paid = match (paid, &stored) {
                (Some(paid), _) => AmountInput::from(paid),
                (None, Some(t)) => AmountInput::from(t.paid_amount),
                (None, None) => AmountInput::default(),
            };
            let date = date
                .or_else(|| stored.as_ref().map(|t| t.date))
                .unwrap_or_else(today);
            let draft = TransactionDraft::bill(customer_id, bill_no, date, AmountInput::from(total), paid);
            let bill = store.upsert_transaction(&draft, Some(id)).await?;
            println!("{}", serde_json::to_string_pretty(&bill)?);
        }
        Commands::Pay {
            customer_id,
            amount,
            date,
        } => {
            let payment = state
                .entity_store()
                .writer()
                .receive_payment(customer_id, date.unwrap_or_else(today), AmountInput::from(amount))
                .await?;
            println!("{}", serde_json::to_string_pretty(&payment)?);
        }
        Commands::Statement { customer_id } => {
            let statement = state.entity_store().statement(customer_id).await?;
            println!("{}  pending {}", statement.customer.name, statement.pending);
            for line in &statement.lines {
                let t = &line.transaction;
                println!(
                    "{}  {:<10} total {:>10}  paid {:>10}  balance {:>10}",
                    t.date, t.bill_no, t.total_amount, t.paid_amount, line.balance
                );
            }
        }
        Commands::Collection { date } => {
            let collection = state
                .entity_store()
                .daily_collection(date.unwrap_or_else(today))
                .await?;
            for line in &collection.lines {
                println!("{:<24} {:<10} {:>10}", line.customer_name, line.bill_no, line.paid_amount);
            }
            println!("{} collected {}", collection.date, collection.total);
        }
        Commands::Backup { file } => {
            let path = file.unwrap_or_else(|| PathBuf::from(ledger::backup_file_name(today())));
            let snapshot = state.snapshots().export_snapshot().await?;
            let out = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            ledger::write_snapshot(&snapshot, BufWriter::new(out))?;
            println!(
                "{} customers, {} transactions -> {}",
                snapshot.customers.len(),
                snapshot.transactions.len(),
                path.display()
            );
        }
        Commands::Restore { file } => {
            let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let summary = state.snapshots().import_bytes(&bytes).await?;
            println!(
                "imported {} customers, {} transactions",
                summary.customers_inserted, summary.transactions_inserted
            );
            for issue in &summary.errors {
                println!(
                    "  skipped {:?}[{}] (id {:?}) {}: {}",
                    issue.section, issue.index, issue.original_id, issue.code, issue.message
                );
            }
        }
        Commands::Report { file } => {
            let path = file.unwrap_or_else(|| PathBuf::from(ledger::report_file_name(today())));
            let rows = state.snapshots().full_report().await?;
            let out = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            ledger::write_report_csv(&rows, BufWriter::new(out))?;
            println!("{} rows -> {}", rows.len(), path.display());
        }
        Commands::Session { action } => {
            let local = state.local_state();
            match action {
                SessionAction::Start => {
                    let marker = local.start_session(now_millis(), config.session_ttl_millis())?;
                    println!("session valid until {}", marker.expires_at);
                }
                SessionAction::Status => {
                    let active = local.session_active(now_millis());
                    println!("{}", if active { "active" } else { "inactive" });
                }
                SessionAction::End => {
                    local.end_session()?;
                    println!("session ended");
                }
            }
        }
    }

    Ok(())
}

async fn watch(state: &LedgerState, filter: SearchFilter) -> anyhow::Result<()> {
    let (reconciler, handle) = state.reconciler();

    let mut tasks = BackgroundTasks::new();
    let token = tasks.shutdown_token();
    tasks.spawn("change_reconciler", TaskKind::Worker, reconciler.run(token.clone()));

    let mut updates = handle.subscribe();
    tasks.spawn("view_logger", TaskKind::Listener, async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    match snapshot.state {
                        ledger::ReconcileState::Idle => {
                            let view = snapshot.view(&filter);
                            tracing::info!(
                                day = %view.day,
                                customers = view.count(),
                                pending = %view.visible_pending,
                                "View updated"
                            );
                        }
                        ledger::ReconcileState::Error => {
                            tracing::warn!(
                                day = %snapshot.day,
                                error = ?snapshot.last_error.as_ref().map(|e| &e.message),
                                "Data may be stale"
                            );
                        }
                        ledger::ReconcileState::Fetching => {}
                    }
                }
            }
        }
    });

    tracing::info!(day = %handle.snapshot().day, "Watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tasks.shutdown(Duration::from_secs(5)).await;
    Ok(())
}

fn print_view(view: &ledger::RouteView) {
    println!("{} ({})", view.day, view.day.label());
    for row in &view.rows {
        println!(
            "{:>4}  {:<24} {:<14} {:>10}",
            row.customer.serial_no,
            row.customer.name,
            row.customer.mobile.as_deref().unwrap_or("-"),
            row.pending
        );
    }
    println!(
        "{} customers, pending {} (route total {})",
        view.count(),
        view.visible_pending,
        view.total_pending
    );
}
