use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use loanbook::application::receivables::ReceivableFilter;
use loanbook::application::service::{LoanService, SettlementOutcome};
use loanbook::config::Config;
use loanbook::domain::period::{DueStatus, PaymentMode, PaymentStatus};
use loanbook::domain::ports::ContractRepositoryBox;
use loanbook::infrastructure::http::HttpContractRepository;
use loanbook::infrastructure::in_memory::InMemoryContractRepository;
use loanbook::interfaces::csv::receivables_writer::ReceivablesWriter;
use loanbook::interfaces::csv::schedule_writer::ScheduleWriter;
use loanbook::interfaces::json::snapshot_reader::SnapshotReader;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Contract snapshot (JSON). If provided, works on an in-memory copy
    /// instead of the payment service.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Base URL of the payment service (overrides LOANBOOK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Evaluation date, YYYY-MM-DD. Defaults to the local date.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a contract's schedule with due and payment status
    Schedule { contract: String },
    /// Pay one period, in full unless --amount is given
    Pay {
        contract: String,
        sequence: u32,
        #[arg(long)]
        amount: Option<Decimal>,
        /// Only show what the payment would do
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark every outstanding period of a contract as paid
    Settle {
        contract: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Pay down principal on a credit contract, in full unless --amount is given
    PayPrincipal {
        contract: String,
        #[arg(long)]
        amount: Option<Decimal>,
    },
    /// List receivable contracts for the day
    Receivables {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        pay_status: Option<PaymentStatus>,
        #[arg(long)]
        due_status: Option<DueStatus>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Delete a contract and its schedule
    Delete { contract: String },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
}

/// Mutations against a `--data` snapshot never reach the file or the service.
fn note_snapshot_only(data: Option<&Path>) {
    if let Some(path) = data {
        eprintln!(
            "snapshot mode: change applied in memory only, {} was not modified",
            path.display()
        );
    }
}

fn build_repository(cli: &Cli, config: &Config) -> Result<ContractRepositoryBox> {
    if let Some(path) = &cli.data {
        // Work on a local snapshot
        let file = File::open(path).into_diagnostic()?;
        let contracts = SnapshotReader::new(file).contracts().into_diagnostic()?;
        tracing::info!(contracts = contracts.len(), path = %path.display(), "loaded snapshot");
        Ok(Box::new(InMemoryContractRepository::with_contracts(contracts)))
    } else {
        let api_url = cli.api_url.clone().unwrap_or_else(|| config.api_url.clone());
        let repository = HttpContractRepository::new(api_url, config.http_timeout).into_diagnostic()?;
        Ok(Box::new(repository))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().into_diagnostic()?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let service = LoanService::new(build_repository(&cli, &config)?).with_page_size(config.page_size);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Schedule { contract } => {
            let statement = service.statement(&contract, today).await.into_diagnostic()?;
            ScheduleWriter::new(&mut out)
                .write_statement(&statement)
                .into_diagnostic()?;
        }
        Command::Pay {
            contract,
            sequence,
            amount,
            dry_run,
        } => {
            let mode = PaymentMode::from_option(amount);
            if dry_run {
                let projection = service
                    .preview_period_payment(&contract, sequence, mode)
                    .await
                    .into_diagnostic()?;
                writeln!(out, "applied,remaining_after,status_after").into_diagnostic()?;
                writeln!(
                    out,
                    "{},{},{}",
                    projection.applied, projection.remaining_after, projection.status_after
                )
                .into_diagnostic()?;
            } else {
                service
                    .pay_period(&contract, sequence, mode)
                    .await
                    .into_diagnostic()?;
                note_snapshot_only(cli.data.as_deref());
                let statement = service.statement(&contract, today).await.into_diagnostic()?;
                ScheduleWriter::new(&mut out)
                    .write_statement(&statement)
                    .into_diagnostic()?;
            }
        }
        Command::Settle { contract, dry_run } => {
            let preview = if dry_run {
                service.settlement_preview(&contract).await.into_diagnostic()?
            } else {
                match service.settle_contract(&contract).await.into_diagnostic()? {
                    SettlementOutcome::Settled(preview) => {
                        note_snapshot_only(cli.data.as_deref());
                        preview
                    }
                    SettlementOutcome::NothingOutstanding => {
                        service.settlement_preview(&contract).await.into_diagnostic()?
                    }
                }
            };
            writeln!(out, "contract_id,unpaid_periods,outstanding").into_diagnostic()?;
            writeln!(out, "{},{},{}", contract, preview.unpaid_periods, preview.outstanding)
                .into_diagnostic()?;
        }
        Command::PayPrincipal { contract, amount } => {
            let paid = service
                .pay_principal(&contract, PaymentMode::from_option(amount))
                .await
                .into_diagnostic()?;
            note_snapshot_only(cli.data.as_deref());
            let statement = service.statement(&contract, today).await.into_diagnostic()?;
            writeln!(out, "contract_id,paid,outstanding_principal").into_diagnostic()?;
            writeln!(
                out,
                "{},{},{}",
                contract,
                paid.value().normalize(),
                statement.contract.outstanding_principal
            )
            .into_diagnostic()?;
        }
        Command::Receivables {
            search,
            pay_status,
            due_status,
            page,
        } => {
            let filter = ReceivableFilter {
                search,
                pay_status,
                due_status,
            };
            let report = service.receivables(today, &filter, page).await.into_diagnostic()?;
            eprintln!(
                "contracts: {}, due: {}, overdue: {}, total debt: {}, page {}/{}",
                report.summary.contracts,
                report.summary.due,
                report.summary.overdue,
                report.summary.total_debt,
                report.page.page,
                report.page.total_pages.max(1)
            );
            ReceivablesWriter::new(&mut out)
                .write_report(&report, today)
                .into_diagnostic()?;
        }
        Command::Delete { contract } => {
            service.delete_contract(&contract).await.into_diagnostic()?;
            note_snapshot_only(cli.data.as_deref());
            writeln!(out, "deleted {contract}").into_diagnostic()?;
        }
    }

    Ok(())
}
