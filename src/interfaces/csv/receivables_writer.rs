use crate::application::service::ReceivablesReport;
use crate::error::Result;
use chrono::NaiveDate;
use std::io::Write;

const HEADER: [&str; 9] = [
    "contract_id",
    "customer_name",
    "kind",
    "current_sequence",
    "payment_status",
    "due_status",
    "remaining",
    "total_outstanding",
    "total_debt",
];

/// Writes one page of the receivables list as CSV.
pub struct ReceivablesWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReceivablesWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_report(&mut self, report: &ReceivablesReport, today: NaiveDate) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for contract in &report.page.items {
            let current = contract.current_period(today);
            self.writer.write_record([
                contract.contract_id.clone(),
                contract.customer_name.clone(),
                contract.kind().to_string(),
                current.map(|p| p.sequence.to_string()).unwrap_or_default(),
                current.map(|p| p.payment_status.to_string()).unwrap_or_default(),
                current.map(|p| p.due_status(today).to_string()).unwrap_or_default(),
                current.map(|p| p.remaining().to_string()).unwrap_or_default(),
                contract.total_outstanding().to_string(),
                contract.total_debt().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
