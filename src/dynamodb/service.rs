use async_trait::async_trait;

use crate::dynamodb::{Capacity, Item, ScanCursor, ScanPage, TableDescriptor, TableSchema};
use crate::error::ServiceResult;

/// Maximum number of put requests in one `BatchWriteItem` call.
pub const BATCH_WRITE_MAX_ITEMS: usize = 25;

/// The managed table service the copier talks to.
///
/// Every call blocks (awaits) until DynamoDB answers; nothing here is
/// retried except the unprocessed items of `write_batch`.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Describes a table. Fails with `ServiceError::NotFound` if it is absent.
    async fn describe(&self, table: &str) -> ServiceResult<TableDescriptor>;

    /// Creates a provisioned-throughput table with the given schema.
    async fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
        capacity: Capacity,
    ) -> ServiceResult<()>;

    /// Blocks until the table reports `ACTIVE`.
    async fn wait_until_active(&self, table: &str) -> ServiceResult<TableDescriptor>;

    /// Blocks until describing the table reports it missing.
    async fn wait_until_deleted(&self, table: &str) -> ServiceResult<()>;

    /// Reads one page of a full-table scan, starting after `cursor`.
    async fn scan_page(&self, table: &str, cursor: Option<ScanCursor>) -> ServiceResult<ScanPage>;

    /// Durably writes at most [`BATCH_WRITE_MAX_ITEMS`] items, resubmitting
    /// whatever the service reports as unprocessed.
    async fn write_batch(&self, table: &str, items: Vec<Item>) -> ServiceResult<()>;

    /// Changes the provisioned throughput of the table.
    async fn update_throughput(&self, table: &str, capacity: Capacity) -> ServiceResult<()>;

    /// Issues the table deletion; does not wait for it to finish.
    async fn delete_table(&self, table: &str) -> ServiceResult<()>;
}
