pub mod receivables_writer;
pub mod schedule_writer;
