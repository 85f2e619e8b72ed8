//! # lanwatch core
//!
//! The two components that turn noisy network signals into a stable device history.
//!
//! * **[`presence`]**: decides whether a configured host is online, falling back
//!   from its configured IP to its hostname and then to its MAC in the ARP table.
//! * **[`history`]**: keeps one record per physical device and derives events
//!   (new device, reconnection, disconnection, address change) from each scan.
//!
//! [`cycle`] wires them together for one scan. The network itself is reached
//! only through the [`probe::NetworkProber`] port, so both components can run
//! against a scripted network in tests.

pub mod cycle;
pub mod history;
pub mod presence;
pub mod probe;
pub mod vendors;
