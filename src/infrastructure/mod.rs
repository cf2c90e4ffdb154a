//! Implementations of the `ContractRepository` port.

pub mod http;
pub mod in_memory;
