//! Domain model and pure reconciliation logic for the wire-cutter
//! status monitor.
//!
//! Nothing in this crate performs I/O. The sources crate turns HTTP
//! responses into normalized results, and the monitor crate drives
//! [`reconcile::Reconciler`] and [`status::derive`] on a timer.

pub mod error;
pub mod model;
pub mod reconcile;
pub mod status;
pub mod types;
