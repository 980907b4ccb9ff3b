use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    types::{
        AttributeDefinition as SdkAttributeDefinition, BillingMode, KeySchemaElement, KeyType,
        ProvisionedThroughput, PutRequest, ScalarAttributeType, TableDescription,
        TableStatus as SdkTableStatus, WriteRequest,
    },
    Client,
};
use std::fmt::Debug;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::dynamodb::service::{TableService, BATCH_WRITE_MAX_ITEMS};
use crate::dynamodb::{
    AttributeDefinition, Capacity, FieldType, Item, KeyElement, KeyRole, ScanCursor, ScanPage,
    TableDescriptor, TableSchema, TableStatus,
};
use crate::error::{ServiceError, ServiceResult};
use crate::utils::{poll_until, resubmit_until_written, RetrySettings, Submission};

/// Where and as whom to connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
    /// Region override, otherwise the profile's or environment's region.
    pub region: Option<String>,
    /// Custom endpoint (for local DynamoDB).
    pub endpoint_url: Option<String>,
}

impl ConnectionOptions {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        let profile = self.profile.as_deref().unwrap_or("default");
        match (&self.endpoint_url, &self.region) {
            (Some(url), _) => format!("Local DynamoDB ({url}, profile: {profile})"),
            (None, Some(region)) => format!("AWS DynamoDB (region: {region}, profile: {profile})"),
            (None, None) => format!("AWS DynamoDB (profile: {profile})"),
        }
    }
}

/// Polling used for table creation and deletion.
///
/// The defaults match the AWS `TableExists`/`TableNotExists` waiters.
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub max_attempts: usize,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            max_attempts: 25,
        }
    }
}

impl WaitSettings {
    fn total(&self) -> Duration {
        self.poll_interval * self.max_attempts as u32
    }
}

/// DynamoDB client wrapper implementing [`TableService`].
///
/// # DynamoDB Concepts
///
/// - **DescribeTable** is the only way to learn whether a table exists and
///   what state it is in; creation and deletion are asynchronous on the
///   service side, so both are followed by polling.
/// - **Scan** returns at most 1 MB per call and a `LastEvaluatedKey` when
///   there is more to read.
/// - **BatchWriteItem** accepts up to 25 put requests and may hand some of
///   them back as `UnprocessedItems` when the table is throttled.
///
/// # Example
///
/// ```rust
/// use dynamodb::{ConnectionOptions, DynamoDb};
///
/// let ddb = DynamoDb::connect(&ConnectionOptions {
///     profile: Some("staging".into()),
///     ..Default::default()
/// })
/// .await;
/// let description = ddb.describe("users").await?;
/// ```
#[derive(Debug)]
pub struct DynamoDb {
    client: Client,
    waits: WaitSettings,
    batch_retry: RetrySettings,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            waits: WaitSettings::default(),
            batch_retry: RetrySettings::default(),
        }
    }

    /// Loads the SDK configuration for `options` and creates a client from it.
    pub async fn connect(options: &ConnectionOptions) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(profile) = &options.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(&sdk_config)
    }
}

#[async_trait]
impl TableService for DynamoDb {
    async fn describe(&self, table: &str) -> ServiceResult<TableDescriptor> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => {
                let description = output.table().ok_or_else(|| ServiceError::MalformedDescription {
                    table: table.to_string(),
                    field: "Table",
                })?;
                descriptor_from_sdk(table, description)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Err(ServiceError::NotFound {
                    table: table.to_string(),
                })
            }
            Err(err) => Err(sdk_error("DescribeTable", table, err)),
        }
    }

    async fn create_table(
        &self,
        table: &str,
        schema: &TableSchema,
        capacity: Capacity,
    ) -> ServiceResult<()> {
        let attribute_definitions = schema
            .attributes()
            .iter()
            .map(|attribute| {
                SdkAttributeDefinition::builder()
                    .attribute_name(&attribute.name)
                    .attribute_type(ScalarAttributeType::from(attribute.field_type.code()))
                    .build()
                    .map_err(|e| build_error("attribute definition", e))
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let key_schema = schema
            .key_schema()
            .iter()
            .map(|key| {
                let key_type = match key.role {
                    KeyRole::Partition => KeyType::Hash,
                    KeyRole::Sort => KeyType::Range,
                };
                KeySchemaElement::builder()
                    .attribute_name(&key.name)
                    .key_type(key_type)
                    .build()
                    .map_err(|e| build_error("key schema", e))
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        self.client
            .create_table()
            .table_name(table)
            .billing_mode(BillingMode::Provisioned)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .provisioned_throughput(provisioned_throughput(capacity)?)
            .send()
            .await
            .map_err(|e| sdk_error("CreateTable", table, e))?;

        info!("Table '{table}' creation requested with capacity {capacity}");
        Ok(())
    }

    async fn wait_until_active(&self, table: &str) -> ServiceResult<TableDescriptor> {
        let active = poll_until(
            move || async move {
                match self.describe(table).await {
                    Ok(description) if description.is_active() => Ok(Some(description)),
                    Ok(description) => {
                        debug!("Table '{table}' is {:?}", description.status);
                        Ok(None)
                    }
                    // DescribeTable can lag right after CreateTable.
                    Err(err) if err.is_not_found() => Ok(None),
                    Err(err) => Err(err),
                }
            },
            self.waits.poll_interval,
            self.waits.max_attempts,
        )
        .await?;

        active.ok_or_else(|| ServiceError::WaitTimeout {
            table: table.to_string(),
            target: "active",
            waited: self.waits.total(),
        })
    }

    async fn wait_until_deleted(&self, table: &str) -> ServiceResult<()> {
        let deleted = poll_until(
            move || async move {
                match self.describe(table).await {
                    Ok(_) => Ok(None),
                    Err(err) if err.is_not_found() => Ok(Some(())),
                    Err(err) => Err(err),
                }
            },
            self.waits.poll_interval,
            self.waits.max_attempts,
        )
        .await?;

        deleted.ok_or_else(|| ServiceError::WaitTimeout {
            table: table.to_string(),
            target: "deleted",
            waited: self.waits.total(),
        })
    }

    async fn scan_page(&self, table: &str, cursor: Option<ScanCursor>) -> ServiceResult<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(cursor.map(ScanCursor::into_inner))
            .send()
            .await
            .map_err(|e| sdk_error("Scan", table, e))?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(Item::from)
            .collect();
        let next = output
            .last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(ScanCursor);

        Ok(ScanPage { items, next })
    }

    async fn write_batch(&self, table: &str, items: Vec<Item>) -> ServiceResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        if items.len() > BATCH_WRITE_MAX_ITEMS {
            return Err(ServiceError::Build {
                what: "BatchWriteItem",
                message: format!(
                    "{} items exceed the limit of {BATCH_WRITE_MAX_ITEMS}",
                    items.len()
                ),
            });
        }

        let pending = items
            .into_iter()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(item.into_attributes()))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
                    .map_err(|e| build_error("put", e))
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        resubmit_until_written(table, pending, self.batch_retry, |batch| {
            let request = self
                .client
                .batch_write_item()
                .request_items(table, batch)
                .send();
            async move {
                match request.await {
                    Ok(output) => Ok(Submission::Unprocessed(
                        output
                            .unprocessed_items
                            .and_then(|mut unprocessed| unprocessed.remove(table))
                            .unwrap_or_default(),
                    )),
                    Err(err)
                        if err.as_service_error().is_some_and(|e| {
                            e.is_provisioned_throughput_exceeded_exception()
                                || e.is_request_limit_exceeded()
                        }) =>
                    {
                        Ok(Submission::Throttled)
                    }
                    Err(err) => Err(sdk_error("BatchWriteItem", table, err)),
                }
            }
        })
        .await
    }

    async fn update_throughput(&self, table: &str, capacity: Capacity) -> ServiceResult<()> {
        self.client
            .update_table()
            .table_name(table)
            .provisioned_throughput(provisioned_throughput(capacity)?)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateTable", table, e))?;

        info!("Table '{table}' capacity update to {capacity} requested");
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> ServiceResult<()> {
        match self.client.delete_table().table_name(table).send().await {
            Ok(_) => {
                info!("Table '{table}' deletion requested");
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Err(ServiceError::NotFound {
                    table: table.to_string(),
                })
            }
            Err(err) => Err(sdk_error("DeleteTable", table, err)),
        }
    }
}

fn provisioned_throughput(capacity: Capacity) -> ServiceResult<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(capacity.read_units)
        .write_capacity_units(capacity.write_units)
        .build()
        .map_err(|e| build_error("provisioned throughput", e))
}

pub(crate) fn descriptor_from_sdk(
    table: &str,
    description: &TableDescription,
) -> ServiceResult<TableDescriptor> {
    let malformed = |field| ServiceError::MalformedDescription {
        table: table.to_string(),
        field,
    };

    let attributes = description
        .attribute_definitions()
        .iter()
        .map(|attribute| {
            FieldType::from_code(attribute.attribute_type().as_str())
                .map(|field_type| AttributeDefinition::new(attribute.attribute_name(), field_type))
                .ok_or_else(|| malformed("a known attribute type"))
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    let key_schema = description
        .key_schema()
        .iter()
        .map(|key| {
            let role = match key.key_type() {
                KeyType::Hash => KeyRole::Partition,
                KeyType::Range => KeyRole::Sort,
                _ => return Err(malformed("a known key type")),
            };
            Ok(KeyElement::new(key.attribute_name(), role))
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    // On-demand tables report zero units.
    let capacity = description
        .provisioned_throughput()
        .map(|throughput| {
            Capacity::new(
                throughput.read_capacity_units().unwrap_or_default(),
                throughput.write_capacity_units().unwrap_or_default(),
            )
        })
        .unwrap_or(Capacity::new(0, 0));

    let status = match description.table_status() {
        Some(SdkTableStatus::Creating) => TableStatus::Creating,
        Some(SdkTableStatus::Active) => TableStatus::Active,
        Some(SdkTableStatus::Updating) => TableStatus::Updating,
        Some(SdkTableStatus::Deleting) => TableStatus::Deleting,
        _ => TableStatus::Other,
    };

    Ok(TableDescriptor {
        name: description.table_name().unwrap_or(table).to_string(),
        schema: TableSchema::from_parts(attributes, key_schema),
        capacity,
        status,
    })
}

fn sdk_error<E, R>(operation: &'static str, table: &str, err: SdkError<E, R>) -> ServiceError
where
    E: std::error::Error + 'static,
    R: Debug,
{
    ServiceError::Sdk {
        operation,
        table: table.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn build_error(what: &'static str, err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Build {
        what,
        message: err.to_string(),
    }
}
