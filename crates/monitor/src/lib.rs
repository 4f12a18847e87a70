//! `wirecut-monitor` library crate.
//!
//! Drives the status reconciliation cycle on a timer and hands each
//! result to an observer. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod reporter;
pub mod scheduler;
