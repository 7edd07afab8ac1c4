//! Library backing the `ql-query` binary.
//!
//! Configuration comes from `QL_QUERY_*` environment variables overridden by
//! command-line flags; logs go to stderr through `tracing`; records are read
//! as JSON lines.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod records;
