//! Daemon test suites.

pub(crate) mod support;
