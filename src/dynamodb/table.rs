use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dynamodb::service::{TableService, BATCH_WRITE_MAX_ITEMS};
use crate::dynamodb::{Capacity, Item, ScanCursor, ScanPage, TableDescriptor, TableSchema};
use crate::error::ServiceResult;

/// A named DynamoDB table in one account and region.
///
/// The handle pairs the table name with the service (profile, region,
/// endpoint) it lives in, so the source and destination of a copy can sit
/// in different accounts.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dynamodb::{DynamoDb, TableHandle};
///
/// let service = Arc::new(DynamoDb::new(&sdk_config));
/// let table = TableHandle::new("user_messages", service);
/// let description = table.describe().await?;
/// ```
#[derive(Clone)]
pub struct TableHandle {
    name: String,
    service: Arc<dyn TableService>,
}

impl fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TableHandle {
    /// Creates a new `TableHandle` instance.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the DynamoDB table.
    /// * `service` - The service the table is reached through.
    pub fn new(name: impl Into<String>, service: Arc<dyn TableService>) -> Self {
        Self {
            name: name.into(),
            service,
        }
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn describe(&self) -> ServiceResult<TableDescriptor> {
        self.service.describe(&self.name).await
    }

    /// Creates this table with `schema` and `capacity`.
    pub async fn create(&self, schema: &TableSchema, capacity: Capacity) -> ServiceResult<()> {
        self.service
            .create_table(&self.name, schema, capacity)
            .await
    }

    pub async fn wait_until_active(&self) -> ServiceResult<TableDescriptor> {
        self.service.wait_until_active(&self.name).await
    }

    pub async fn wait_until_deleted(&self) -> ServiceResult<()> {
        self.service.wait_until_deleted(&self.name).await
    }

    pub async fn scan_page(&self, cursor: Option<ScanCursor>) -> ServiceResult<ScanPage> {
        self.service.scan_page(&self.name, cursor).await
    }

    pub async fn update_capacity(&self, capacity: Capacity) -> ServiceResult<()> {
        self.service.update_throughput(&self.name, capacity).await
    }

    pub async fn delete(&self) -> ServiceResult<()> {
        self.service.delete_table(&self.name).await
    }

    /// Opens a buffered write session on this table.
    ///
    /// The session must be closed with [`BatchWriter::finish`]; items still
    /// buffered when the writer is dropped are lost.
    pub fn batch_writer(&self) -> BatchWriter<'_> {
        BatchWriter {
            table: self,
            buffer: Vec::with_capacity(BATCH_WRITE_MAX_ITEMS),
            written: 0,
        }
    }
}

/// Buffered batch writes to one table.
///
/// Items accumulate until a full batch is available, which is then written
/// (including retries of unprocessed items) before `put` returns.
#[derive(Debug)]
pub struct BatchWriter<'a> {
    table: &'a TableHandle,
    buffer: Vec<Item>,
    written: usize,
}

impl BatchWriter<'_> {
    /// Buffers an item, flushing a full batch first if needed.
    pub async fn put(&mut self, item: Item) -> ServiceResult<()> {
        self.buffer.push(item);
        if self.buffer.len() >= BATCH_WRITE_MAX_ITEMS {
            self.flush().await?;
        }
        Ok(())
    }

    /// Writes everything currently buffered.
    pub async fn flush(&mut self) -> ServiceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(BATCH_WRITE_MAX_ITEMS));
        let count = batch.len();
        self.table
            .service
            .write_batch(&self.table.name, batch)
            .await?;
        self.written += count;
        debug!(table = %self.table.name, count, total = self.written, "Flushed batch");
        Ok(())
    }

    /// Flushes the remaining items and returns how many were written in
    /// total during this session.
    pub async fn finish(mut self) -> ServiceResult<usize> {
        self.flush().await?;
        Ok(self.written)
    }
}
