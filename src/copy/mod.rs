//! The copy itself: schema replication, data migration and the run that
//! sequences them.

mod migrator;
mod orchestrator;
mod replicator;

pub use orchestrator::TableCopier;

#[cfg(test)]
pub use migrator::migrate;
#[cfg(test)]
pub use orchestrator::{CopyOutcome, SettleSettings};
