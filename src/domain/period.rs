use super::money::{Amount, Money};
use crate::error::{PaymentError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::value::{self, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Temporal classification of a period relative to "today".
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DueStatus {
    #[serde(rename = "Chưa đến hạn")]
    NotYetDue,
    #[serde(rename = "Đến hạn")]
    Due,
    #[serde(rename = "Quá hạn")]
    Overdue,
    /// A whole interest cycle was missed. Only the payment service can tell,
    /// so this value is carried through from upstream and never derived here.
    #[serde(rename = "Quá kỳ đóng lãi")]
    OverdueInterestCycle,
}

impl DueStatus {
    /// Classifies `due_date` against `today`.
    ///
    /// An exact match is `Due`, a future date is `NotYetDue`. A past date is
    /// `Overdue`, unless upstream already flagged it `OverdueInterestCycle`.
    pub fn classify(due_date: NaiveDate, today: NaiveDate, upstream: Option<DueStatus>) -> Self {
        if due_date == today {
            DueStatus::Due
        } else if due_date > today {
            DueStatus::NotYetDue
        } else if upstream == Some(DueStatus::OverdueInterestCycle) {
            DueStatus::OverdueInterestCycle
        } else {
            DueStatus::Overdue
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, DueStatus::Overdue | DueStatus::OverdueInterestCycle)
    }

    pub fn code(&self) -> &'static str {
        match self {
            DueStatus::NotYetDue => "not_yet_due",
            DueStatus::Due => "due",
            DueStatus::Overdue => "overdue",
            DueStatus::OverdueInterestCycle => "overdue_interest_cycle",
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not_yet_due" => Ok(DueStatus::NotYetDue),
            "due" => Ok(DueStatus::Due),
            "overdue" => Ok(DueStatus::Overdue),
            "overdue_interest_cycle" => Ok(DueStatus::OverdueInterestCycle),
            other => Err(format!("unknown due status '{other}'")),
        }
    }
}

/// Settlement classification of a period relative to the amount paid.
///
/// `FullyPaid` and `Settled` are absorbing; `Settled` is only reached
/// through a contract-level settlement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "Chưa thanh toán")]
    Unpaid,
    #[serde(rename = "Thanh toán một phần")]
    PartiallyPaid,
    #[serde(rename = "Đóng đủ")]
    FullyPaid,
    #[serde(rename = "Đã tất toán")]
    Settled,
}

impl PaymentStatus {
    pub fn derive(amount_due: Money, amount_paid: Money) -> Self {
        if amount_paid >= amount_due {
            PaymentStatus::FullyPaid
        } else if amount_paid.is_zero() {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PaymentStatus::FullyPaid | PaymentStatus::Settled)
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::FullyPaid => "fully_paid",
            PaymentStatus::Settled => "settled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partially_paid" => Ok(PaymentStatus::PartiallyPaid),
            "fully_paid" => Ok(PaymentStatus::FullyPaid),
            "settled" => Ok(PaymentStatus::Settled),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

/// How much of an outstanding balance the caller wants to pay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaymentMode {
    Full,
    Partial(Decimal),
}

impl PaymentMode {
    pub fn from_option(amount: Option<Decimal>) -> Self {
        amount.map_or(PaymentMode::Full, PaymentMode::Partial)
    }

    /// The raw amount to submit against `outstanding`. Not validated yet.
    pub fn amount_for(&self, outstanding: Money) -> Decimal {
        match self {
            PaymentMode::Full => outstanding.value(),
            PaymentMode::Partial(amount) => *amount,
        }
    }
}

/// What a payment would do to a period, computed before committing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentProjection {
    pub applied: Money,
    pub remaining_after: Money,
    pub status_after: PaymentStatus,
}

/// One scheduled installment or interest period of a contract.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(from = "PeriodRecord", into = "PeriodRecord")]
pub struct PaymentPeriod {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub note: String,
    pub payment_status: PaymentStatus,
    /// Classification reported by the payment service, if any.
    pub upstream_due_status: Option<DueStatus>,
}

impl PaymentPeriod {
    pub fn new(sequence: u32, due_date: NaiveDate, amount_due: Money) -> Self {
        Self {
            sequence,
            due_date,
            amount_due,
            amount_paid: Money::ZERO,
            note: String::new(),
            payment_status: PaymentStatus::Unpaid,
            upstream_due_status: None,
        }
    }

    /// Sets the amount already paid and re-derives the payment status.
    pub fn with_amount_paid(mut self, amount_paid: Money) -> Self {
        self.amount_paid = amount_paid;
        self.payment_status = PaymentStatus::derive(self.amount_due, amount_paid);
        self
    }

    pub fn with_upstream_due_status(mut self, status: DueStatus) -> Self {
        self.upstream_due_status = Some(status);
        self
    }

    pub fn remaining(&self) -> Money {
        self.amount_due - self.amount_paid
    }

    pub fn due_status(&self, today: NaiveDate) -> DueStatus {
        DueStatus::classify(self.due_date, today, self.upstream_due_status)
    }

    /// Whether the payment control for this period should be enabled.
    pub fn is_payable(&self, today: NaiveDate) -> bool {
        !self.remaining().is_zero() && !self.due_status(today).is_overdue()
    }

    pub fn preview_payment(&self, amount: Decimal) -> Result<PaymentProjection> {
        let amount = Amount::new(amount)?;
        let remaining = self.remaining();
        if amount.value() > remaining.value() {
            return Err(PaymentError::AmountExceedsRemaining {
                amount: amount.value(),
                remaining: remaining.value(),
            });
        }

        let paid_after = self.amount_paid + amount.into();
        let status_after = if paid_after >= self.amount_due {
            PaymentStatus::FullyPaid
        } else {
            PaymentStatus::PartiallyPaid
        };

        Ok(PaymentProjection {
            applied: amount.into(),
            remaining_after: self.amount_due - paid_after,
            status_after,
        })
    }

    /// Applies a payment to this period only.
    ///
    /// Rejects non-positive amounts and amounts above the remaining balance;
    /// the period is left untouched on error.
    pub fn apply_payment(&mut self, amount: Decimal) -> Result<PaymentProjection> {
        let projection = self.preview_payment(amount)?;
        self.amount_paid += projection.applied;
        self.payment_status = projection.status_after;
        Ok(projection)
    }

    /// Marks the period paid as part of a contract settlement.
    /// Returns false if nothing was outstanding.
    pub fn settle(&mut self) -> bool {
        if self.remaining().is_zero() {
            return false;
        }
        self.amount_paid = self.amount_due;
        self.payment_status = PaymentStatus::Settled;
        true
    }
}

/// Signed number of days from `today` until `due_date`.
pub fn days_until(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}

#[derive(Serialize, Deserialize)]
struct PeriodRecord {
    #[serde(rename = "Stt")]
    sequence: u32,
    #[serde(rename = "Ngay", deserialize_with = "deserialize_date")]
    due_date: NaiveDate,
    #[serde(rename = "SoTien")]
    amount_due: Money,
    #[serde(rename = "TienDaTra", default)]
    amount_paid: Option<Money>,
    #[serde(rename = "NoiDung", default)]
    note: Option<String>,
    #[serde(rename = "TrangThaiThanhToan", default, deserialize_with = "deserialize_label")]
    payment_status: Option<PaymentStatus>,
    #[serde(rename = "TrangThaiNgayThanhToan", default, deserialize_with = "deserialize_label")]
    due_status: Option<DueStatus>,
}

impl From<PeriodRecord> for PaymentPeriod {
    fn from(record: PeriodRecord) -> Self {
        let amount_paid = record.amount_paid.unwrap_or_default();
        Self {
            sequence: record.sequence,
            due_date: record.due_date,
            amount_due: record.amount_due,
            amount_paid,
            note: record.note.unwrap_or_default(),
            payment_status: record
                .payment_status
                .unwrap_or_else(|| PaymentStatus::derive(record.amount_due, amount_paid)),
            upstream_due_status: record.due_status,
        }
    }
}

impl From<PaymentPeriod> for PeriodRecord {
    fn from(period: PaymentPeriod) -> Self {
        Self {
            sequence: period.sequence,
            due_date: period.due_date,
            amount_due: period.amount_due,
            amount_paid: Some(period.amount_paid),
            note: Some(period.note),
            payment_status: Some(period.payment_status),
            due_status: period.upstream_due_status,
        }
    }
}

/// Decodes a status label, mapping empty or unknown labels to `None`.
///
/// The service is not strict about its vocabulary; one odd label must not
/// fail the whole contract.
fn deserialize_label<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.and_then(|raw| {
        let label: StrDeserializer<'_, value::Error> = raw.trim().into_deserializer();
        T::deserialize(label).ok()
    }))
}

/// Accepts `YYYY-MM-DD` as well as full ISO timestamps; only the date is kept.
pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            parse_date(&raw).map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{raw}': {e}"))
}
