use crate::domain::contract::Contract;
use crate::domain::money::Money;
use crate::domain::period::{DueStatus, PaymentStatus};
use chrono::NaiveDate;
use serde::Serialize;

/// Criteria for the receivables list. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivableFilter {
    pub search: Option<String>,
    pub pay_status: Option<PaymentStatus>,
    pub due_status: Option<DueStatus>,
}

impl ReceivableFilter {
    /// Status filters are matched against the contract's current period.
    pub fn matches(&self, contract: &Contract, today: NaiveDate) -> bool {
        let matches_search = self.search.as_deref().is_none_or(|term| {
            let term = term.to_lowercase();
            contract.contract_id.to_lowercase().contains(&term)
                || contract.customer_name.to_lowercase().contains(&term)
        });

        let current = contract.current_period(today);
        let matches_pay = self
            .pay_status
            .is_none_or(|status| current.is_some_and(|p| p.payment_status == status));
        let matches_due = self
            .due_status
            .is_none_or(|status| current.is_some_and(|p| p.due_status(today) == status));

        matches_search && matches_pay && matches_due
    }
}

/// Headline counters over the whole receivables list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceivablesSummary {
    pub contracts: usize,
    pub due: usize,
    pub overdue: usize,
    pub total_debt: Money,
}

impl ReceivablesSummary {
    pub fn compute(contracts: &[Contract], today: NaiveDate) -> Self {
        let statuses: Vec<Option<DueStatus>> = contracts
            .iter()
            .map(|c| c.current_period(today).map(|p| p.due_status(today)))
            .collect();

        Self {
            contracts: contracts.len(),
            due: statuses
                .iter()
                .filter(|s| **s == Some(DueStatus::Due))
                .count(),
            overdue: statuses
                .iter()
                .filter(|s| s.is_some_and(|s| s.is_overdue()))
                .count(),
            total_debt: contracts.iter().map(Contract::total_debt).sum(),
        }
    }
}

/// One page of a list, 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into pages of `page_size`, clamping `page` into range.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}
