//! Pure business rules: money, payment periods, contracts, and the port to
//! the payment service. Nothing in here performs I/O or reads the clock.

pub mod contract;
pub mod money;
pub mod period;
pub mod ports;
