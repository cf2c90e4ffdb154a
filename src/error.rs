use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Decimal),
    #[error("Amount {amount} exceeds remaining balance {remaining}")]
    AmountExceedsRemaining { amount: Decimal, remaining: Decimal },
    #[error("Rejected by payment service: {0}")]
    RemoteRejected(String),
    #[error("Connection to payment service failed: {0}")]
    NetworkError(String),
    #[error("Contract not found: {0}")]
    ContractNotFound(String),
    #[error("Period {sequence} not found in contract {contract_id}")]
    PeriodNotFound { contract_id: String, sequence: u32 },
    #[error("Operation not supported for contract {0}")]
    UnsupportedContractKind(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PaymentError {
    /// Errors raised before anything is sent to the payment service.
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self,
            PaymentError::InvalidAmount(_) | PaymentError::AmountExceedsRemaining { .. }
        )
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(error: reqwest::Error) -> Self {
        PaymentError::NetworkError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
