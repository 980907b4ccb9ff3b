//! In-memory table service for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dynamodb::service::{TableService, BATCH_WRITE_MAX_ITEMS};
use crate::dynamodb::{
    Capacity, Item, ScanCursor, ScanPage, TableDescriptor, TableSchema, TableStatus,
};
use crate::error::{ServiceError, ServiceResult};

const DEFAULT_PAGE_SIZE: usize = 100;

/// A recorded call against the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Describe(String),
    Create { table: String, capacity: Capacity },
    Scan { table: String, cursor: Option<ScanCursor> },
    /// Records the table's capacity at the time of the write.
    WriteBatch { table: String, count: usize, capacity: Capacity },
    UpdateThroughput { table: String, capacity: Capacity },
    Delete(String),
}

impl Call {
    pub fn table(&self) -> &str {
        match self {
            Call::Describe(table) | Call::Delete(table) => table,
            Call::Create { table, .. }
            | Call::Scan { table, .. }
            | Call::WriteBatch { table, .. }
            | Call::UpdateThroughput { table, .. } => table,
        }
    }

    /// Whether the call changes the table.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Describe(_) | Call::Scan { .. })
    }
}

#[derive(Debug)]
struct MemTable {
    descriptor: TableDescriptor,
    items: Vec<Item>,
}

impl MemTable {
    fn key_of(&self, item: &Item) -> Option<Item> {
        item.key(self.descriptor.schema.key_names())
    }

    fn position(&self, key: &Item) -> Option<usize> {
        self.items
            .iter()
            .position(|item| self.key_of(item).as_ref() == Some(key))
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemTable>,
    calls: Vec<Call>,
    page_size: Option<usize>,
    fail_create: bool,
    fail_write_batch_at: Option<usize>,
    fail_scan_at: Option<usize>,
    fail_delete: bool,
    fail_update_throughput: bool,
    lag_throughput_updates: bool,
    fail_describe_at: Option<(String, usize)>,
    write_batches: usize,
    scans: usize,
    describes: HashMap<String, usize>,
}

/// Tables kept in memory, behaving like DynamoDB as far as the copier can
/// tell: keyed upserts, paginated scans with a last-evaluated-key cursor,
/// the 25-item batch limit and rejection of no-op throughput updates.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTables {
    state: Arc<RwLock<State>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits every scan page to `page_size` items.
    pub async fn set_page_size(&self, page_size: usize) {
        self.state.write().await.page_size = Some(page_size);
    }

    pub async fn fail_create(&self) {
        self.state.write().await.fail_create = true;
    }

    /// Makes the `n`th `write_batch` call (0-based) fail.
    pub async fn fail_write_batch_at(&self, n: usize) {
        self.state.write().await.fail_write_batch_at = Some(n);
    }

    /// Makes the `n`th `scan_page` call (0-based) fail.
    pub async fn fail_scan_at(&self, n: usize) {
        self.state.write().await.fail_scan_at = Some(n);
    }

    pub async fn fail_delete(&self) {
        self.state.write().await.fail_delete = true;
    }

    pub async fn fail_update_throughput(&self) {
        self.state.write().await.fail_update_throughput = true;
    }

    /// Accepts throughput updates without ever reporting the new capacity.
    pub async fn lag_throughput_updates(&self) {
        self.state.write().await.lag_throughput_updates = true;
    }

    /// Makes the `n`th `describe` call (0-based) on `table` fail.
    pub async fn fail_describe_at(&self, table: &str, n: usize) {
        self.state.write().await.fail_describe_at = Some((table.to_string(), n));
    }

    /// Adds an active table holding `items`.
    pub async fn insert_table(
        &self,
        name: &str,
        schema: TableSchema,
        capacity: Capacity,
        items: Vec<Item>,
    ) {
        let table = MemTable {
            descriptor: TableDescriptor {
                name: name.to_string(),
                schema,
                capacity,
                status: TableStatus::Active,
            },
            items: Vec::new(),
        };
        let mut state = self.state.write().await;
        state.tables.insert(name.to_string(), table);
        if let Some(table) = state.tables.get_mut(name) {
            for item in items {
                upsert(table, item);
            }
        }
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.read().await.calls.clone()
    }

    pub async fn exists(&self, table: &str) -> bool {
        self.state.read().await.tables.contains_key(table)
    }

    pub async fn items(&self, table: &str) -> Option<Vec<Item>> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.items.clone())
    }

    pub async fn descriptor(&self, table: &str) -> Option<TableDescriptor> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.descriptor.clone())
    }
}

fn upsert(table: &mut MemTable, item: Item) {
    let existing = table.key_of(&item).and_then(|key| table.position(&key));
    match existing {
        Some(index) => table.items[index] = item,
        None => table.items.push(item),
    }
}

fn injected(operation: &'static str, table: &str) -> ServiceError {
    ServiceError::Sdk {
        operation,
        table: table.to_string(),
        message: "injected failure".to_string(),
    }
}

fn not_found(table: &str) -> ServiceError {
    ServiceError::NotFound {
        table: table.to_string(),
    }
}

#[async_trait]
impl TableService for InMemoryTables {
    async fn describe(&self, table: &str) -> ServiceResult<TableDescriptor> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Describe(table.to_string()));
        let count = state.describes.entry(table.to_string()).or_default();
        let describe = *count;
        *count += 1;
        if state.fail_describe_at.as_ref() == Some(&(table.to_string(), describe)) {
            return Err(injected("DescribeTable", table));
        }
        state
            .tables
            .get(table)
            .map(|t| t.descriptor.clone())
            .ok_or_else(|| not_found(table))
    }

    async fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
        capacity: Capacity,
    ) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Create {
            table: table.to_string(),
            capacity,
        });
        if state.fail_create {
            return Err(injected("CreateTable", table));
        }
        if state.tables.contains_key(table) {
            return Err(ServiceError::Sdk {
                operation: "CreateTable",
                table: table.to_string(),
                message: "ResourceInUseException: Table already exists".to_string(),
            });
        }
        state.tables.insert(
            table.to_string(),
            MemTable {
                descriptor: TableDescriptor {
                    name: table.to_string(),
                    schema: schema.clone(),
                    capacity,
                    status: TableStatus::Creating,
                },
                items: Vec::new(),
            },
        );
        Ok(())
    }

    async fn wait_until_active(&self, table: &str) -> ServiceResult<TableDescriptor> {
        let mut state = self.state.write().await;
        let entry = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        entry.descriptor.status = TableStatus::Active;
        Ok(entry.descriptor.clone())
    }

    async fn wait_until_deleted(&self, table: &str) -> ServiceResult<()> {
        let state = self.state.read().await;
        if state.tables.contains_key(table) {
            return Err(ServiceError::WaitTimeout {
                table: table.to_string(),
                target: "deleted",
                waited: std::time::Duration::ZERO,
            });
        }
        Ok(())
    }

    async fn scan_page(&self, table: &str, cursor: Option<ScanCursor>) -> ServiceResult<ScanPage> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Scan {
            table: table.to_string(),
            cursor: cursor.clone(),
        });
        let scan = state.scans;
        state.scans += 1;
        if state.fail_scan_at == Some(scan) {
            return Err(injected("Scan", table));
        }

        let page_size = state.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let entry = state.tables.get(table).ok_or_else(|| not_found(table))?;
        let start = match cursor {
            None => 0,
            Some(ScanCursor(key)) => {
                entry
                    .position(&Item::from(key))
                    .ok_or_else(|| injected("Scan", table))?
                    + 1
            }
        };
        let end = (start + page_size).min(entry.items.len());
        let items = entry.items[start..end].to_vec();
        let next = if end < entry.items.len() {
            items
                .last()
                .and_then(|last| entry.key_of(last))
                .map(|key| ScanCursor(key.into_attributes()))
        } else {
            None
        };

        Ok(ScanPage { items, next })
    }

    async fn write_batch(&self, table: &str, items: Vec<Item>) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        let batch = state.write_batches;
        state.write_batches += 1;

        let capacity = state
            .tables
            .get(table)
            .map(|t| t.descriptor.capacity)
            .ok_or_else(|| not_found(table))?;
        state.calls.push(Call::WriteBatch {
            table: table.to_string(),
            count: items.len(),
            capacity,
        });

        if state.fail_write_batch_at == Some(batch) {
            return Err(injected("BatchWriteItem", table));
        }
        if items.len() > BATCH_WRITE_MAX_ITEMS {
            return Err(ServiceError::Sdk {
                operation: "BatchWriteItem",
                table: table.to_string(),
                message: "ValidationException: Too many items requested".to_string(),
            });
        }

        if let Some(entry) = state.tables.get_mut(table) {
            for item in items {
                upsert(entry, item);
            }
        }
        Ok(())
    }

    async fn update_throughput(&self, table: &str, capacity: Capacity) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(Call::UpdateThroughput {
            table: table.to_string(),
            capacity,
        });
        if state.fail_update_throughput {
            return Err(injected("UpdateTable", table));
        }
        let lag = state.lag_throughput_updates;
        let entry = state.tables.get_mut(table).ok_or_else(|| not_found(table))?;
        if entry.descriptor.capacity == capacity {
            return Err(ServiceError::Sdk {
                operation: "UpdateTable",
                table: table.to_string(),
                message: "ValidationException: The provisioned throughput for the table will not change"
                    .to_string(),
            });
        }
        if !lag {
            entry.descriptor.capacity = capacity;
        }
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Delete(table.to_string()));
        if state.fail_delete {
            return Err(injected("DeleteTable", table));
        }
        state
            .tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| not_found(table))
    }
}
