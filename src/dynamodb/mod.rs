//! # DynamoDB Module
//!
//! The table service the copier runs against, and the types it exchanges.
//!
//! ## Components
//!
//! - `TableService`: the narrow set of DynamoDB calls a copy needs.
//! - `DynamoDb`: the AWS SDK implementation of `TableService`.
//! - `TableHandle`: a named table bound to a service, with a buffered
//!   `BatchWriter`.
//! - `TableDescriptor` / `TableSchema`: what `DescribeTable` tells us.
//! - `Item` / `ScanCursor` / `ScanPage`: scan results, passed through as-is.
//!
//! ## Usage
//!
//! Credentials and region come from the usual AWS sources (environment,
//! shared config files, named profiles). For local development set
//! `AWS_ENDPOINT_URL` (for example `http://localhost:8000`) to talk to
//! DynamoDB Local.

mod client;
mod item;
#[cfg(test)]
pub mod memory;
mod schema;
mod service;
mod table;

pub use client::{ConnectionOptions, DynamoDb};
#[cfg(test)]
pub(crate) use client::descriptor_from_sdk;
pub use item::{Item, ScanCursor, ScanPage};
pub use schema::{
    AttributeDefinition, Capacity, FieldType, KeyElement, KeyRole, TableDescriptor, TableSchema,
    TableStatus,
};
pub use service::TableService;
pub use table::TableHandle;
