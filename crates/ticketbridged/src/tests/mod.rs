//! Behavioural suites for the daemon.

mod capability_behaviour;
pub(crate) mod support;
