//! Data sources polled by the status monitor.
//!
//! [`api::ControllerApi`] fetches raw responses from the controller's
//! HTTP endpoints, [`payloads`] describes their JSON shapes, and
//! [`normalize`] turns each raw result into a typed domain value or a
//! classified [`SourceError`](wirecut_core::error::SourceError).

pub mod api;
pub mod normalize;
pub mod payloads;
pub mod source;
