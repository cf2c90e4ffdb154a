//! File formats used by the command line tool: JSON contract snapshots in,
//! CSV reports out.

pub mod csv;
pub mod json;
