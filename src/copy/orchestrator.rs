use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::copy::migrator::{self, MigrationReport};
use crate::copy::replicator;
use crate::dynamodb::{Capacity, TableDescriptor, TableHandle, TableService};
use crate::error::{CopyError, ServiceError, ServiceResult};
use crate::policy::{CopyMode, CopyPolicy};
use crate::utils::poll_until;

/// Steps of a copy run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPhase {
    Validating,
    ReplicatingSchema,
    ShallowOnly,
    MigratingData,
    Describing,
    Done,
    Failed,
}

impl fmt::Display for CopyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CopyPhase::Validating => "validating",
            CopyPhase::ReplicatingSchema => "replicating schema",
            CopyPhase::ShallowOnly => "shallow only",
            CopyPhase::MigratingData => "migrating data",
            CopyPhase::Describing => "describing",
            CopyPhase::Done => "done",
            CopyPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How long to wait for the ultimate capacity to show up in `DescribeTable`
/// after a deep copy.
#[derive(Debug, Clone, Copy)]
pub struct SettleSettings {
    pub poll_interval: Duration,
    pub max_attempts: usize,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct CopyOutcome {
    pub source: TableDescriptor,
    pub destination: TableDescriptor,
    /// `None` for a shallow copy.
    pub migration: Option<MigrationReport>,
}

/// Runs one copy from start to finish.
///
/// The destination table is only ever created by this run, and only
/// deleted again if copying the data into it fails.
#[derive(Debug)]
pub struct TableCopier {
    policy: CopyPolicy,
    source: TableHandle,
    destination: TableHandle,
    settle: SettleSettings,
}

impl TableCopier {
    pub fn new(
        policy: CopyPolicy,
        source_service: Arc<dyn TableService>,
        destination_service: Arc<dyn TableService>,
    ) -> Self {
        let source = TableHandle::new(policy.source_table.clone(), source_service);
        let destination = TableHandle::new(policy.destination_table.clone(), destination_service);
        Self {
            policy,
            source,
            destination,
            settle: SettleSettings::default(),
        }
    }

    #[cfg(test)]
    pub fn with_settle_settings(mut self, settle: SettleSettings) -> Self {
        self.settle = settle;
        self
    }

    /// Runs the copy. The error is left to the caller to report.
    pub async fn run(&self) -> Result<CopyOutcome, CopyError> {
        self.execute()
            .await
            .inspect_err(|_| enter(CopyPhase::Failed))
    }

    async fn execute(&self) -> Result<CopyOutcome, CopyError> {
        enter(CopyPhase::Validating);
        let source = self.validate().await?;

        match self.policy.mode {
            CopyMode::Deep => info!("Start copying table and migrating the data..."),
            CopyMode::Shallow => info!("Start copying the table without migrating the data..."),
        }
        println!("Below is the short description of the source table:");
        println!("{source}");

        enter(CopyPhase::ReplicatingSchema);
        replicator::replicate(&source, &self.destination, self.policy.creation_capacity())
            .await
            .map_err(|err| CopyError::SchemaCreationFailed {
                table: self.destination.name().to_string(),
                source: err,
            })?;

        let migration = match self.policy.mode {
            CopyMode::Shallow => {
                enter(CopyPhase::ShallowOnly);
                None
            }
            CopyMode::Deep => {
                enter(CopyPhase::MigratingData);
                Some(self.migrate().await?)
            }
        };

        enter(CopyPhase::Describing);
        let destination = self.destination.describe().await?;
        println!("Below is the short description of the destination table:");
        println!("{destination}");

        enter(CopyPhase::Done);
        info!("Finished!");
        Ok(CopyOutcome {
            source,
            destination,
            migration,
        })
    }

    /// Describes both tables: the source must exist, the destination must not.
    async fn validate(&self) -> Result<TableDescriptor, CopyError> {
        let source = match self.source.describe().await {
            Ok(source) => source,
            Err(err) if err.is_not_found() => {
                return Err(CopyError::SourceNotFound {
                    table: self.source.name().to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        match self.destination.describe().await {
            Ok(_) => Err(CopyError::DestinationAlreadyExists {
                table: self.destination.name().to_string(),
            }),
            Err(err) if err.is_not_found() => Ok(source),
            Err(err) => Err(err.into()),
        }
    }

    async fn migrate(&self) -> Result<MigrationReport, CopyError> {
        let result = migrator::migrate(
            &self.source,
            &self.destination,
            self.policy.staging,
            self.policy.ultimate,
        )
        .await;

        match result {
            Ok(report) => {
                info!(
                    "Successfully copied {} items ({} scan pages) from table {} to table {}, spent {} seconds.",
                    report.items,
                    report.pages,
                    self.source.name(),
                    self.destination.name(),
                    report.elapsed.as_secs()
                );
                self.settle(self.policy.ultimate).await;
                Ok(report)
            }
            Err(migration) => {
                error!(
                    "Some unexpected errors occurred when copying the table, deleting the duplication table {}: {migration}",
                    self.destination.name()
                );
                match self.rollback().await {
                    Ok(()) => Err(CopyError::MigrationFailed {
                        table: self.destination.name().to_string(),
                        source: migration,
                    }),
                    Err(cleanup) => Err(CopyError::RollbackFailed {
                        table: self.destination.name().to_string(),
                        migration,
                        cleanup,
                    }),
                }
            }
        }
    }

    async fn rollback(&self) -> ServiceResult<()> {
        self.destination.delete().await?;
        self.destination.wait_until_deleted().await?;
        info!("Deleted the destination table {}", self.destination.name());
        Ok(())
    }

    /// Waits until the destination reports `capacity` and is active again.
    ///
    /// A timeout only logs a warning.
    async fn settle(&self, capacity: Capacity) {
        let destination = &self.destination;
        let settled = poll_until(
            move || async move {
                let description = destination.describe().await?;
                Ok::<_, ServiceError>(
                    (description.is_active() && description.capacity == capacity).then_some(()),
                )
            },
            self.settle.poll_interval,
            self.settle.max_attempts,
        )
        .await;

        match settled {
            Ok(Some(())) => info!("Destination table capacity is now {capacity}"),
            Ok(None) => warn!(
                "Destination table {} does not report capacity {capacity} yet",
                destination.name()
            ),
            Err(err) => warn!(
                "Could not confirm the capacity of the destination table {}: {err}",
                destination.name()
            ),
        }
    }
}

fn enter(phase: CopyPhase) {
    info!(%phase, "Entering phase");
}
