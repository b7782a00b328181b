//! CLI command implementations.

pub(crate) mod completions;
pub(crate) mod control;
pub(crate) mod info;
pub(crate) mod list_ports;
pub(crate) mod transfer;
