use super::money::{Amount, Money};
use super::period::{DueStatus, PaymentMode, PaymentPeriod, deserialize_optional_date};
use crate::error::{PaymentError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

/// Loan product, identified by the contract id prefix.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// "Tín chấp", ids start with `TC`.
    Credit,
    /// "Trả góp", ids start with `TG`.
    Installment,
    /// Any other prefix; read-only for principal operations.
    Other,
}

impl ContractKind {
    /// Derives the kind from the contract id prefix.
    pub fn from_contract_id(contract_id: &str) -> Self {
        if contract_id.starts_with("TC") {
            ContractKind::Credit
        } else if contract_id.starts_with("TG") {
            ContractKind::Installment
        } else {
            ContractKind::Other
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContractKind::Credit => "credit",
            ContractKind::Installment => "installment",
            ContractKind::Other => "other",
        })
    }
}

/// Preview shown before settling a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementPreview {
    /// Periods with a remaining balance.
    pub unpaid_periods: usize,
    /// Sum of their remaining balances.
    pub outstanding: Money,
}

impl SettlementPreview {
    pub fn is_empty(&self) -> bool {
        self.unpaid_periods == 0
    }
}

/// A loan contract and its payment schedule.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Contract {
    /// Contract id; the prefix determines the [`ContractKind`].
    #[serde(rename = "MaHD")]
    pub contract_id: String,
    #[serde(rename = "HoTen", default)]
    pub customer_name: String,
    /// Disbursement date, when the service reports it.
    #[serde(
        rename = "NgayVay",
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub loan_date: Option<NaiveDate>,
    /// Amount originally lent.
    #[serde(rename = "SoTienVay", default)]
    pub principal: Money,
    /// Interest still owed across the schedule.
    #[serde(rename = "LaiConLai", default)]
    pub outstanding_interest: Money,
    /// Principal still owed; only credit contracts pay it down separately.
    #[serde(rename = "GocConLai", default)]
    pub outstanding_principal: Money,
    /// Payment schedule in the order the service returned it.
    #[serde(rename = "LichSuTraLai", default)]
    pub periods: Vec<PaymentPeriod>,
    /// Set once the contract has been settled in full.
    #[serde(rename = "DaTatToan", default)]
    pub settled: bool,
}

impl Contract {
    /// Creates a new `Contract` with no schedule and the whole principal outstanding.
    pub fn new(contract_id: impl Into<String>, customer_name: impl Into<String>, principal: Money) -> Self {
        Self {
            contract_id: contract_id.into(),
            customer_name: customer_name.into(),
            loan_date: None,
            principal,
            outstanding_interest: Money::ZERO,
            outstanding_principal: principal,
            periods: Vec::new(),
            settled: false,
        }
    }

    /// Appends periods and accounts for their unpaid part as outstanding interest.
    pub fn with_periods(mut self, periods: Vec<PaymentPeriod>) -> Self {
        self.outstanding_interest += periods.iter().map(PaymentPeriod::remaining).sum::<Money>();
        self.periods.extend(periods);
        self
    }

    /// Returns the loan product of this contract.
    pub fn kind(&self) -> ContractKind {
        ContractKind::from_contract_id(&self.contract_id)
    }

    /// Looks up a period by its sequence number.
    pub fn period(&self, sequence: u32) -> Option<&PaymentPeriod> {
        self.periods.iter().find(|p| p.sequence == sequence)
    }

    /// Mutable lookup, failing with `PeriodNotFound`.
    pub fn period_mut(&mut self, sequence: u32) -> Result<&mut PaymentPeriod> {
        let contract_id = &self.contract_id;
        self.periods
            .iter_mut()
            .find(|p| p.sequence == sequence)
            .ok_or_else(|| PaymentError::PeriodNotFound {
                contract_id: contract_id.clone(),
                sequence,
            })
    }

    /// Sum of the remaining balance of every period.
    pub fn total_outstanding(&self) -> Money {
        self.periods.iter().map(PaymentPeriod::remaining).sum()
    }

    /// Interest plus principal still owed, as reported by the service.
    pub fn total_debt(&self) -> Money {
        self.outstanding_interest + self.outstanding_principal
    }

    fn by_date(&self) -> Vec<&PaymentPeriod> {
        let mut periods: Vec<&PaymentPeriod> = self.periods.iter().collect();
        periods.sort_by_key(|p| (p.due_date, p.sequence));
        periods
    }

    /// Picks the period whose status represents the contract today.
    ///
    /// Exact date match first, then the earliest `Due`, then the earliest
    /// `NotYetDue`, then the first period in sequence order.
    pub fn current_period(&self, today: NaiveDate) -> Option<&PaymentPeriod> {
        if let Some(exact) = self.periods.iter().find(|p| p.due_date == today) {
            return Some(exact);
        }

        let sorted = self.by_date();
        sorted
            .iter()
            .find(|p| p.due_status(today) == DueStatus::Due)
            .or_else(|| {
                sorted
                    .iter()
                    .find(|p| p.due_status(today) == DueStatus::NotYetDue)
            })
            .copied()
            .or_else(|| self.periods.iter().min_by_key(|p| p.sequence))
    }

    /// The earliest upcoming period that still has something to pay.
    pub fn next_payment(&self, today: NaiveDate) -> Option<&PaymentPeriod> {
        self.by_date().into_iter().find(|p| {
            p.due_date >= today
                && !p.remaining().is_zero()
                && p.due_status(today) == DueStatus::NotYetDue
        })
    }

    /// Payment history in display order: due, then upcoming, then the rest,
    /// newest first within each group.
    pub fn history(&self, today: NaiveDate) -> Vec<&PaymentPeriod> {
        let rank = |p: &PaymentPeriod| match p.due_status(today) {
            DueStatus::Due => 0,
            DueStatus::NotYetDue => 1,
            _ => 2,
        };
        let mut periods: Vec<&PaymentPeriod> = self.periods.iter().collect();
        periods.sort_by_key(|p| (rank(p), Reverse(p.due_date)));
        periods
    }

    pub fn settlement_preview(&self) -> SettlementPreview {
        let unpaid: Vec<Money> = self
            .periods
            .iter()
            .map(PaymentPeriod::remaining)
            .filter(|r| !r.is_zero())
            .collect();
        SettlementPreview {
            unpaid_periods: unpaid.len(),
            outstanding: unpaid.into_iter().sum(),
        }
    }

    /// Marks every outstanding period paid. A no-op when nothing is owed.
    pub fn settle(&mut self) -> SettlementPreview {
        let preview = self.settlement_preview();
        if preview.is_empty() {
            return preview;
        }
        for period in &mut self.periods {
            period.settle();
        }
        self.outstanding_interest = Money::ZERO;
        self.settled = true;
        preview
    }

    /// Resolves and validates the principal amount to submit.
    pub fn plan_principal_payment(&self, mode: PaymentMode) -> Result<Amount> {
        if self.kind() != ContractKind::Credit {
            return Err(PaymentError::UnsupportedContractKind(self.contract_id.clone()));
        }
        let amount = Amount::new(mode.amount_for(self.outstanding_principal))?;
        if amount.value() > self.outstanding_principal.value() {
            return Err(PaymentError::AmountExceedsRemaining {
                amount: amount.value(),
                remaining: self.outstanding_principal.value(),
            });
        }
        Ok(amount)
    }

    pub fn pay_principal(&mut self, amount: Amount) {
        self.outstanding_principal = self.outstanding_principal - amount.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::period::PaymentStatus;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 3, 10)
    }

    #[test]
    fn test_contract_kind_from_prefix() {
        assert_eq!(ContractKind::from_contract_id("TC001"), ContractKind::Credit);
        assert_eq!(ContractKind::from_contract_id("TG042"), ContractKind::Installment);
        assert_eq!(ContractKind::from_contract_id("HD-1"), ContractKind::Other);
    }

    #[test]
    fn test_current_period_prefers_due() {
        let contract = Contract::new("TC001", "A", Money::new(dec!(10_000_000))).with_periods(vec![
            PaymentPeriod::new(1, date(2025, 4, 10), Money::new(dec!(100))),
            PaymentPeriod::new(2, today(), Money::new(dec!(100))),
            PaymentPeriod::new(3, date(2025, 2, 10), Money::new(dec!(100))),
        ]);
        assert_eq!(contract.current_period(today()).unwrap().sequence, 2);
    }

    #[test]
    fn test_current_period_falls_back_to_earliest_not_yet_due() {
        let contract = Contract::new("TC001", "A", Money::new(dec!(10_000_000))).with_periods(vec![
            PaymentPeriod::new(1, date(2025, 5, 10), Money::new(dec!(100))),
            PaymentPeriod::new(2, date(2025, 4, 10), Money::new(dec!(100))),
        ]);
        assert_eq!(contract.current_period(today()).unwrap().sequence, 2);
    }

    #[test]
    fn test_current_period_falls_back_to_first_in_sequence() {
        let contract = Contract::new("TG001", "B", Money::new(dec!(1_000))).with_periods(vec![
            PaymentPeriod::new(4, date(2025, 1, 10), Money::new(dec!(100))),
            PaymentPeriod::new(2, date(2025, 2, 10), Money::new(dec!(100))),
        ]);
        assert_eq!(contract.current_period(today()).unwrap().sequence, 2);

        let empty = Contract::new("TG002", "C", Money::ZERO);
        assert!(empty.current_period(today()).is_none());
    }

    #[test]
    fn test_next_payment_skips_paid_periods() {
        let contract = Contract::new("TC001", "A", Money::new(dec!(1_000))).with_periods(vec![
            PaymentPeriod::new(1, date(2025, 3, 20), Money::new(dec!(100)))
                .with_amount_paid(Money::new(dec!(100))),
            PaymentPeriod::new(2, date(2025, 4, 20), Money::new(dec!(100))),
            PaymentPeriod::new(3, date(2025, 3, 1), Money::new(dec!(100))),
        ]);
        assert_eq!(contract.next_payment(today()).unwrap().sequence, 2);
    }

    #[test]
    fn test_history_order() {
        let contract = Contract::new("TC001", "A", Money::new(dec!(1_000))).with_periods(vec![
            PaymentPeriod::new(1, date(2025, 1, 10), Money::new(dec!(100))),
            PaymentPeriod::new(2, date(2025, 2, 10), Money::new(dec!(100))),
            PaymentPeriod::new(3, today(), Money::new(dec!(100))),
            PaymentPeriod::new(4, date(2025, 4, 10), Money::new(dec!(100))),
            PaymentPeriod::new(5, date(2025, 5, 10), Money::new(dec!(100))),
        ]);
        let order: Vec<u32> = contract.history(today()).iter().map(|p| p.sequence).collect();
        assert_eq!(order, vec![3, 5, 4, 2, 1]);
    }

    #[test]
    fn test_settle_contract() {
        let mut contract = Contract::new("TC001", "A", Money::new(dec!(5_000))).with_periods(vec![
            PaymentPeriod::new(1, date(2025, 2, 10), Money::new(dec!(1000)))
                .with_amount_paid(Money::new(dec!(200))),
            PaymentPeriod::new(2, date(2025, 3, 10), Money::new(dec!(500)))
                .with_amount_paid(Money::new(dec!(500))),
        ]);

        let preview = contract.settlement_preview();
        assert_eq!(preview.unpaid_periods, 1);
        assert_eq!(preview.outstanding, Money::new(dec!(800)));

        contract.settle();
        assert!(contract.periods.iter().all(|p| p.amount_paid == p.amount_due));
        assert_eq!(contract.total_outstanding(), Money::ZERO);
        assert_eq!(contract.periods[0].payment_status, PaymentStatus::Settled);
        assert_eq!(contract.periods[1].payment_status, PaymentStatus::FullyPaid);
        assert!(contract.settled);
    }

    #[test]
    fn test_settle_without_outstanding_is_noop() {
        let mut contract = Contract::new("TC001", "A", Money::new(dec!(5_000))).with_periods(vec![
            PaymentPeriod::new(1, today(), Money::new(dec!(100)))
                .with_amount_paid(Money::new(dec!(100))),
        ]);
        let before = contract.clone();
        assert!(contract.settle().is_empty());
        assert_eq!(contract, before);
    }

    #[test]
    fn test_plan_principal_payment() {
        let mut contract = Contract::new("TC001", "A", Money::new(dec!(5_000_000)));
        assert_eq!(
            contract.plan_principal_payment(PaymentMode::Full).unwrap().value(),
            dec!(5_000_000)
        );
        let partial = contract
            .plan_principal_payment(PaymentMode::Partial(dec!(2_000_000)))
            .unwrap();
        contract.pay_principal(partial);
        assert_eq!(contract.outstanding_principal, Money::new(dec!(3_000_000)));

        assert!(matches!(
            contract.plan_principal_payment(PaymentMode::Partial(dec!(0))),
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            contract.plan_principal_payment(PaymentMode::Partial(dec!(3_000_001))),
            Err(PaymentError::AmountExceedsRemaining { .. })
        ));
    }

    #[test]
    fn test_principal_payment_only_for_credit_contracts() {
        let contract = Contract::new("TG001", "B", Money::new(dec!(1_000)));
        assert!(matches!(
            contract.plan_principal_payment(PaymentMode::Full),
            Err(PaymentError::UnsupportedContractKind(id)) if id == "TG001"
        ));
    }

    #[test]
    fn test_contract_deserialization() {
        let json = r#"{
            "MaHD": "TC001",
            "HoTen": "Nguyễn Văn A",
            "NgayVay": "2025-01-10",
            "SoTienVay": 10000000,
            "LaiConLai": 300000,
            "GocConLai": 10000000,
            "LichSuTraLai": [
                {"Stt": 1, "Ngay": "2025-02-10", "SoTien": 300000, "TienDaTra": 0}
            ]
        }"#;
        let contract: Contract = serde_json::from_str(json).unwrap();
        assert_eq!(contract.kind(), ContractKind::Credit);
        assert_eq!(contract.loan_date, Some(date(2025, 1, 10)));
        assert_eq!(contract.total_debt(), Money::new(dec!(10_300_000)));
        assert_eq!(contract.periods.len(), 1);
        assert!(!contract.settled);
    }
}
