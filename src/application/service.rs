use super::receivables::{Page, ReceivableFilter, ReceivablesSummary, paginate};
use crate::domain::contract::{Contract, SettlementPreview};
use crate::domain::money::{Amount, Money};
use crate::domain::period::{DueStatus, PaymentMode, PaymentPeriod, PaymentProjection};
use crate::domain::ports::ContractRepositoryBox;
use crate::error::{PaymentError, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

/// A contract's schedule as seen on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractStatement {
    pub contract: Contract,
    /// The day every status in this statement is computed against.
    pub today: NaiveDate,
    /// Sequence of the period that represents the contract today.
    pub current_sequence: Option<u32>,
    /// Sequence of the next upcoming period with something left to pay.
    pub next_payment_sequence: Option<u32>,
    pub total_outstanding: Money,
}

impl ContractStatement {
    /// Creates a new `ContractStatement`, evaluating the schedule against `today`.
    pub fn new(contract: Contract, today: NaiveDate) -> Self {
        let current_sequence = contract.current_period(today).map(|p| p.sequence);
        let next_payment_sequence = contract.next_payment(today).map(|p| p.sequence);
        let total_outstanding = contract.total_outstanding();
        Self {
            contract,
            today,
            current_sequence,
            next_payment_sequence,
            total_outstanding,
        }
    }

    /// Due status of the current period, if the contract has any period.
    pub fn current_due_status(&self) -> Option<DueStatus> {
        self.current_sequence
            .and_then(|seq| self.contract.period(seq))
            .map(|p| p.due_status(self.today))
    }
}

/// Receipt for a committed period payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPaymentReceipt {
    pub projection: PaymentProjection,
    pub period: PaymentPeriod,
}

/// Outcome of a settlement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The service accepted the settlement of these periods.
    Settled(SettlementPreview),
    /// Every period was already paid; nothing was sent.
    NothingOutstanding,
}

/// Receivables list for one day, filtered and paginated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivablesReport {
    pub summary: ReceivablesSummary,
    pub page: Page<Contract>,
}

/// Entry point for every payment operation.
///
/// Local validation always runs before the repository is called, so invalid
/// amounts never reach the payment service. One remote call per operation,
/// no retries.
pub struct LoanService {
    repository: ContractRepositoryBox,
    page_size: usize,
}

impl LoanService {
    /// Creates a new `LoanService` over the given repository.
    pub fn new(repository: ContractRepositoryBox) -> Self {
        Self {
            repository,
            page_size: 10,
        }
    }

    /// Sets the receivables page size; zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetches a contract and evaluates its schedule against `today`.
    pub async fn statement(&self, contract_id: &str, today: NaiveDate) -> Result<ContractStatement> {
        let contract = self.repository.fetch_contract(contract_id).await?;
        Ok(ContractStatement::new(contract, today))
    }

    /// Computes what paying `mode` against a period would do, without committing.
    pub async fn preview_period_payment(
        &self,
        contract_id: &str,
        sequence: u32,
        mode: PaymentMode,
    ) -> Result<PaymentProjection> {
        let period = self.find_period(contract_id, sequence).await?;
        period.preview_payment(mode.amount_for(period.remaining()))
    }

    /// Pays one period in full or in part.
    ///
    /// The amount is checked against the period's remaining balance first;
    /// only a valid amount is submitted to the repository.
    pub async fn pay_period(
        &self,
        contract_id: &str,
        sequence: u32,
        mode: PaymentMode,
    ) -> Result<PeriodPaymentReceipt> {
        let period = self.find_period(contract_id, sequence).await?;
        let projection = period
            .preview_payment(mode.amount_for(period.remaining()))
            .inspect_err(|e| warn!(contract_id, sequence, error = %e, "period payment refused locally"))?;
        let amount = Amount::new(projection.applied.value())?;

        let updated = self
            .repository
            .pay_period(contract_id, sequence, amount)
            .await?;
        info!(
            contract_id,
            sequence,
            amount = %projection.applied,
            status = %updated.payment_status,
            "period payment committed"
        );
        Ok(PeriodPaymentReceipt {
            projection,
            period: updated,
        })
    }

    /// Counts the unpaid periods and their total, without settling.
    pub async fn settlement_preview(&self, contract_id: &str) -> Result<SettlementPreview> {
        Ok(self
            .repository
            .fetch_contract(contract_id)
            .await?
            .settlement_preview())
    }

    /// Settles every outstanding period of the contract in one batch.
    pub async fn settle_contract(&self, contract_id: &str) -> Result<SettlementOutcome> {
        let preview = self.settlement_preview(contract_id).await?;
        if preview.is_empty() {
            info!(contract_id, "nothing outstanding, settlement skipped");
            return Ok(SettlementOutcome::NothingOutstanding);
        }

        self.repository.pay_contract_full(contract_id).await?;
        info!(
            contract_id,
            periods = preview.unpaid_periods,
            outstanding = %preview.outstanding,
            "contract settled"
        );
        Ok(SettlementOutcome::Settled(preview))
    }

    /// Pays down principal on a credit contract. Returns the amount submitted.
    /// Pays down principal on a credit contract.
    ///
    /// Returns the amount submitted. Non-credit contracts and amounts above
    /// the outstanding principal are refused locally.
    pub async fn pay_principal(&self, contract_id: &str, mode: PaymentMode) -> Result<Amount> {
        let contract = self.repository.fetch_contract(contract_id).await?;
        let amount = contract
            .plan_principal_payment(mode)
            .inspect_err(|e| warn!(contract_id, error = %e, "principal payment refused locally"))?;

        self.repository.pay_principal(contract_id, amount).await?;
        info!(contract_id, amount = %amount.value(), "principal payment committed");
        Ok(amount)
    }

    /// Deletes a contract together with its schedule.
    pub async fn delete_contract(&self, contract_id: &str) -> Result<()> {
        self.repository.delete_contract(contract_id).await?;
        info!(contract_id, "contract deleted");
        Ok(())
    }

    /// Builds one page of the receivables list for `today`.
    ///
    /// The summary covers the whole list; the filter only narrows the page.
    pub async fn receivables(
        &self,
        today: NaiveDate,
        filter: &ReceivableFilter,
        page: usize,
    ) -> Result<ReceivablesReport> {
        let contracts = self.repository.fetch_receivables(today).await?;
        let summary = ReceivablesSummary::compute(&contracts, today);
        let filtered: Vec<Contract> = contracts
            .into_iter()
            .filter(|c| filter.matches(c, today))
            .collect();

        Ok(ReceivablesReport {
            summary,
            page: paginate(filtered, page, self.page_size),
        })
    }

    async fn find_period(&self, contract_id: &str, sequence: u32) -> Result<PaymentPeriod> {
        self.repository
            .fetch_periods(contract_id)
            .await?
            .into_iter()
            .find(|p| p.sequence == sequence)
            .ok_or_else(|| PaymentError::PeriodNotFound {
                contract_id: contract_id.to_string(),
                sequence,
            })
    }
}
