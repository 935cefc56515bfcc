//! Test suites for the service runner lifecycle.

pub(crate) mod support;
mod unit;
