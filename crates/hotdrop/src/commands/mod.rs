//! CLI command implementations.

pub(crate) mod diff;
pub(crate) mod scan;
pub(crate) mod serve;

pub(crate) use diff::DiffArgs;
pub(crate) use scan::ScanArgs;
pub(crate) use serve::ServeArgs;
