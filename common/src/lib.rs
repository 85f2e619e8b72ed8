//! # lanwatch common
//!
//! Types shared by every lanwatch crate.
//!
//! * **[`network`]**: what goes into and comes out of a presence probe
//!   ([`network::host::HostDescriptor`], [`network::host::PresenceResult`]) and
//!   what a scanner reports ([`network::observation::DeviceObservation`]).
//! * **[`history`]**: the durable per-device model and the events derived from it.
//! * **[`utils`]**: the TTL cache and bounded log used by both components.
//! * **[`config`]** and **[`error`]**: runtime knobs and the error taxonomy.

pub mod config;
pub mod error;
pub mod history;
pub mod network;
pub mod utils;
