//! Integration Tests
//!
//! End-to-end tests through the `rowtable` facade: the Student scenario,
//! file-based configuration and multi-table transactions.

#[path = "../common/mod.rs"]
mod common;

mod config_file;
mod student_scenario;
mod transactions;
