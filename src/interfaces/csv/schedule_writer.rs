use crate::application::service::ContractStatement;
use crate::domain::period::days_until;
use crate::error::Result;
use std::io::Write;

const HEADER: [&str; 11] = [
    "sequence",
    "due_date",
    "days_until",
    "amount_due",
    "amount_paid",
    "remaining",
    "payment_status",
    "due_status",
    "payable",
    "current",
    "note",
];

/// Writes a contract's payment schedule as CSV, in history display order.
pub struct ScheduleWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ScheduleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_statement(&mut self, statement: &ContractStatement) -> Result<()> {
        let today = statement.today;
        self.writer.write_record(HEADER)?;
        for period in statement.contract.history(today) {
            self.writer.write_record([
                period.sequence.to_string(),
                period.due_date.to_string(),
                days_until(period.due_date, today).to_string(),
                period.amount_due.to_string(),
                period.amount_paid.to_string(),
                period.remaining().to_string(),
                period.payment_status.to_string(),
                period.due_status(today).to_string(),
                period.is_payable(today).to_string(),
                (statement.current_sequence == Some(period.sequence)).to_string(),
                period.note.clone(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
