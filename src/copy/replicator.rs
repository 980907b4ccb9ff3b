use tracing::info;

use crate::dynamodb::{Capacity, TableDescriptor, TableHandle};
use crate::error::ServiceResult;

/// Creates `destination` with the source's attribute definitions and key
/// schema at `capacity`, and waits until it is active.
///
/// The caller has already checked that `destination` does not exist.
pub async fn replicate(
    source: &TableDescriptor,
    destination: &TableHandle,
    capacity: Capacity,
) -> ServiceResult<TableDescriptor> {
    info!("Creating the destination table {} ...", destination.name());
    destination.create(&source.schema, capacity).await?;

    let created = destination.wait_until_active().await?;
    info!(
        "Created an empty table {} as the duplication of the table {}.",
        destination.name(),
        source.name
    );
    Ok(created)
}
