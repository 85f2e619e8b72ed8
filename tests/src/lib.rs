//! Scenarios that cross the presence detector, the history store, and the scan cycle.

#[cfg(test)]
mod support;

#[cfg(test)]
mod history;

#[cfg(test)]
mod monitoring;
