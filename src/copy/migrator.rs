use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::dynamodb::{Capacity, ScanCursor, TableHandle};
use crate::error::ServiceResult;

/// What a completed data migration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub items: usize,
    pub pages: usize,
    pub elapsed: Duration,
}

/// Copies every item of `source` into `destination`, then moves the
/// destination from its `staging` capacity to `ultimate`.
///
/// The scan follows continuation tokens until the service reports the end of
/// the table. Items go through a batch writer which is fully flushed before
/// the capacity changes. Any fault aborts the migration; rolling back the
/// destination is up to the caller.
pub async fn migrate(
    source: &TableHandle,
    destination: &TableHandle,
    staging: Capacity,
    ultimate: Capacity,
) -> ServiceResult<MigrationReport> {
    let started = Instant::now();
    let mut writer = destination.batch_writer();
    let mut cursor: Option<ScanCursor> = None;
    let mut pages = 0;

    loop {
        let page = source.scan_page(cursor).await?;
        pages += 1;
        info!(
            "Scanned {} items from the source table {}",
            page.items.len(),
            source.name()
        );

        for item in page.items {
            writer.put(item).await?;
        }

        cursor = match page.next {
            Some(next) => Some(next),
            None => break,
        };
    }

    let items = writer.finish().await?;

    if staging == ultimate {
        debug!(
            "Destination {} already has capacity {ultimate}",
            destination.name()
        );
    } else {
        destination.update_capacity(ultimate).await?;
    }

    Ok(MigrationReport {
        items,
        pages,
        elapsed: started.elapsed(),
    })
}
