use crate::domain::contract::{Contract, ContractKind};
use crate::domain::money::Amount;
use crate::domain::period::PaymentPeriod;
use crate::domain::ports::ContractRepository;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A thread-safe in-memory stand-in for the payment service.
///
/// Applies the same acceptance rules as the remote backend, so it doubles as
/// the reference behaviour in tests and as the backend for local snapshots.
#[derive(Default, Clone)]
pub struct InMemoryContractRepository {
    contracts: Arc<RwLock<HashMap<String, Contract>>>,
}

impl InMemoryContractRepository {
    /// Creates a new, empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contracts(contracts: impl IntoIterator<Item = Contract>) -> Self {
        let map = contracts
            .into_iter()
            .map(|c| (c.contract_id.clone(), c))
            .collect();
        Self {
            contracts: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn insert(&self, contract: Contract) {
        let mut contracts = self.contracts.write().await;
        contracts.insert(contract.contract_id.clone(), contract);
    }

    /// All contracts ordered by id.
    pub async fn all(&self) -> Vec<Contract> {
        let contracts = self.contracts.read().await;
        let mut all: Vec<Contract> = contracts.values().cloned().collect();
        all.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));
        all
    }
}

fn rejected(message: String) -> PaymentError {
    PaymentError::RemoteRejected(message)
}

fn open_contract<'a>(
    contracts: &'a mut HashMap<String, Contract>,
    contract_id: &str,
) -> Result<&'a mut Contract> {
    let contract = contracts
        .get_mut(contract_id)
        .ok_or_else(|| PaymentError::ContractNotFound(contract_id.to_string()))?;
    if contract.settled {
        return Err(rejected(format!("Contract {contract_id} is already settled")));
    }
    Ok(contract)
}

#[async_trait]
impl ContractRepository for InMemoryContractRepository {
    async fn fetch_contract(&self, contract_id: &str) -> Result<Contract> {
        let contracts = self.contracts.read().await;
        contracts
            .get(contract_id)
            .cloned()
            .ok_or_else(|| PaymentError::ContractNotFound(contract_id.to_string()))
    }

    async fn fetch_periods(&self, contract_id: &str) -> Result<Vec<PaymentPeriod>> {
        Ok(self.fetch_contract(contract_id).await?.periods)
    }

    async fn fetch_receivables(&self, _today: NaiveDate) -> Result<Vec<Contract>> {
        Ok(self
            .all()
            .await
            .into_iter()
            .filter(|c| !c.settled && !c.total_debt().is_zero())
            .collect())
    }

    async fn pay_period(&self, contract_id: &str, sequence: u32, amount: Amount) -> Result<PaymentPeriod> {
        let mut contracts = self.contracts.write().await;
        let contract = open_contract(&mut contracts, contract_id)?;

        let period = contract.period_mut(sequence)?;
        let projection = period
            .apply_payment(amount.value())
            .map_err(|e| rejected(e.to_string()))?;
        let updated = period.clone();

        contract.outstanding_interest = contract.outstanding_interest - projection.applied;
        debug!(contract_id, sequence, amount = %amount.value(), "period payment recorded");
        Ok(updated)
    }

    async fn pay_contract_full(&self, contract_id: &str) -> Result<()> {
        let mut contracts = self.contracts.write().await;
        let contract = open_contract(&mut contracts, contract_id)?;

        let preview = contract.settle();
        if preview.is_empty() {
            return Err(rejected(format!(
                "Contract {contract_id} has no outstanding periods"
            )));
        }
        debug!(contract_id, periods = preview.unpaid_periods, "contract settled");
        Ok(())
    }

    async fn pay_principal(&self, contract_id: &str, amount: Amount) -> Result<()> {
        let mut contracts = self.contracts.write().await;
        let contract = open_contract(&mut contracts, contract_id)?;

        if contract.kind() != ContractKind::Credit {
            return Err(rejected(format!(
                "Contract {contract_id} does not accept principal payments"
            )));
        }
        if amount.value() > contract.outstanding_principal.value() {
            return Err(rejected(format!(
                "Principal payment {} exceeds outstanding principal {}",
                amount.value(),
                contract.outstanding_principal
            )));
        }
        contract.pay_principal(amount);
        debug!(contract_id, amount = %amount.value(), "principal payment recorded");
        Ok(())
    }

    async fn delete_contract(&self, contract_id: &str) -> Result<()> {
        let mut contracts = self.contracts.write().await;
        contracts
            .remove(contract_id)
            .map(|_| ())
            .ok_or_else(|| PaymentError::ContractNotFound(contract_id.to_string()))
    }
}
