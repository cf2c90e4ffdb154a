use super::contract::Contract;
use super::money::Amount;
use super::period::PaymentPeriod;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Access to the payment service that owns contract state.
///
/// Every mutating call is all-or-nothing from the caller's side: an error
/// means nothing was committed.
#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn fetch_contract(&self, contract_id: &str) -> Result<Contract>;
    async fn fetch_periods(&self, contract_id: &str) -> Result<Vec<PaymentPeriod>>;
    /// Open contracts with something receivable as of `today`.
    async fn fetch_receivables(&self, today: NaiveDate) -> Result<Vec<Contract>>;
    async fn pay_period(&self, contract_id: &str, sequence: u32, amount: Amount) -> Result<PaymentPeriod>;
    async fn pay_contract_full(&self, contract_id: &str) -> Result<()>;
    async fn pay_principal(&self, contract_id: &str, amount: Amount) -> Result<()>;
    /// Removes the contract together with all of its periods.
    async fn delete_contract(&self, contract_id: &str) -> Result<()>;
}

pub type ContractRepositoryBox = Box<dyn ContractRepository>;
