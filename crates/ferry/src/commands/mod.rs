//! CLI command implementations

pub mod explain;
pub mod replay;
pub mod trace;
