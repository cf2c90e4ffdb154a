//! Application layer orchestrating the domain rules against a repository.
//!
//! `LoanService` is the entry point for payments, settlements and principal
//! paydowns; `receivables` builds the daily receivables list.

pub mod receivables;
pub mod service;
