//! # History Models
//!
//! The durable, per-identity view of every device ever observed, and the
//! events derived by diffing a scan against it.

pub mod document;
pub mod event;
pub mod record;
